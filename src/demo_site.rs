//! Seeded pages for the browser demo.

use browser_agent::{SimElement, SimPage, SimulatedBrowser};

pub const HOME: &str = "https://www.costco.com/";
const SEARCH: &str = "https://www.costco.com/CatalogSearch?keyword=";
const MILK: &str = "https://www.costco.com/kirkland-signature-organic-whole-milk.product.html";
const TOWELS: &str = "https://www.costco.com/kirkland-signature-paper-towels.product.html";

pub fn costco(screenshots: bool) -> SimulatedBrowser {
    SimulatedBrowser::new()
        .with_viewport(8)
        .with_screenshots(screenshots)
        .with_page(
            HOME,
            SimPage::new("Costco Wholesale")
                .with_text("Welcome to Costco Wholesale")
                .with_element(SimElement::search_box("Search Costco", SEARCH))
                .with_element(SimElement::button("Sign In / Register"))
                .with_element(SimElement::link("Grocery", format!("{SEARCH}grocery")))
                .with_element(SimElement::link("Kirkland Signature Paper Towels, 12-pack", TOWELS))
                .with_element(SimElement::link("Kirkland Signature Organic Whole Milk, 3 x 64 oz", MILK)),
        )
        .with_page(
            format!("{SEARCH}organic%20milk"),
            SimPage::new("Search Results for organic milk")
                .with_text("Showing 2 results for \"organic milk\"")
                .with_element(SimElement::search_box("Search Costco", SEARCH))
                .with_element(SimElement::link("Kirkland Signature Organic Whole Milk, 3 x 64 oz", MILK))
                .with_element(SimElement::link(
                    "Horizon Organic Whole Milk, 12 x 8 oz",
                    "https://www.costco.com/horizon-organic-whole-milk.product.html",
                )),
        )
        .with_page(
            format!("{SEARCH}paper%20towels"),
            SimPage::new("Search Results for paper towels")
                .with_text("Showing 1 result for \"paper towels\"")
                .with_element(SimElement::search_box("Search Costco", SEARCH))
                .with_element(SimElement::link("Kirkland Signature Paper Towels, 12-pack", TOWELS)),
        )
        .with_page(
            MILK,
            SimPage::new("Kirkland Signature Organic Whole Milk")
                .with_text("Kirkland Signature Organic Whole Milk, 3 x 64 oz\nPrice: $12.99\nMember only item")
                .with_element(SimElement::button_revealing("Add to Cart", "Added to cart: Organic Whole Milk"))
                .with_element(SimElement::link("Back to home", HOME)),
        )
        .with_page(
            TOWELS,
            SimPage::new("Kirkland Signature Paper Towels")
                .with_text("Kirkland Signature Create-A-Size Paper Towels, 12-pack\nPrice: $23.99")
                .with_element(SimElement::button_revealing("Add to Cart", "Added to cart: Paper Towels"))
                .with_element(SimElement::link("Back to home", HOME)),
        )
}
