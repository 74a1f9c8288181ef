//! Text display for the shelf's current product.
//!
//! ```text
//! ┌──────────────────────┐
//! │ Widget               │
//! │ 9.99 €               │
//! │ Art.: SKU1           │
//! │ Scad.: 01/01/2030    │
//! └──────────────────────┘
//! ```

use shelf_core::Product;
use shelf_sync::{Hub, Key, ReadyGate, ShelfEvent};
use tracing::{debug, info, warn};

const SPLASH: [&str; 2] = ["Smart shelf", "Loading..."];
const EMPTY: [&str; 2] = ["Smart shelf", "Empty"];

/// Lines shown for `product`, or the empty-shelf screen.
pub fn render_product_view(product: Option<&Product>) -> Vec<String> {
    match product {
        Some(product) => {
            let expiration = product
                .expiration()
                .map(|date| date.format("%d/%m/%Y").to_string())
                .unwrap_or_else(|| product.expiration_date.clone());

            vec![
                product.name.clone(),
                format!("{:.2} €", product.effective_price()),
                format!("Art.: {}", product.code),
                format!("Scad.: {expiration}"),
            ]
        }
        None => EMPTY.iter().map(|line| line.to_string()).collect(),
    }
}

fn draw(lines: &[String]) {
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let bar = "─".repeat(width + 2);

    println!("┌{bar}┐");
    for line in lines {
        println!("│ {line:<width$} │");
    }
    println!("└{bar}┘");
}

/// Shows the splash screen, opens `gate`, then redraws on every
/// current-product notification until the bus closes.
pub async fn run(hub: Hub<ShelfEvent>, gate: ReadyGate) {
    let pattern = match Key::parse("*.product.current") {
        Ok(pattern) => pattern,
        Err(e) => {
            warn!(error = %e, "Display subscription key rejected");
            return;
        }
    };
    let mut subscription = hub.subscribe([pattern]);
    drop(hub);

    draw(&SPLASH.map(String::from));
    info!("Display setup complete");
    gate.open();

    while let Some((key, event)) = subscription.recv().await {
        match event {
            ShelfEvent::CurrentProduct(product) => {
                debug!(%key, "New current product");
                draw(&render_product_view(product.as_ref()));
            }
            other => debug!(%key, kind = other.kind(), "Display ignoring event"),
        }
    }

    info!("Display stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_product_view() {
        let product = Product::new("w", "SKU1", 100, "Widget", 9.5, "2030-01-01");

        assert_eq!(
            render_product_view(Some(&product)),
            vec!["Widget", "9.50 €", "Art.: SKU1", "Scad.: 01/01/2030"]
        );
    }

    #[test]
    fn test_render_keeps_unparseable_date() {
        let product = Product::new("w", "SKU1", 100, "Widget", 9.5, "end of 2030");
        assert_eq!(render_product_view(Some(&product))[3], "Scad.: end of 2030");
    }

    #[test]
    fn test_render_uses_promo_price() {
        let product = Product::new("w", "SKU1", 100, "Widget", 9.5, "2030-01-01").with_promo(7.0);
        assert_eq!(render_product_view(Some(&product))[1], "7.00 €");
    }

    #[test]
    fn test_render_empty_shelf() {
        assert_eq!(render_product_view(None), vec!["Smart shelf", "Empty"]);
    }

    #[tokio::test]
    async fn test_run_opens_gate() {
        let hub: Hub<ShelfEvent> = Hub::new(4);
        let gate = ReadyGate::new();

        let task = tokio::spawn(run(hub.clone(), gate.clone()));
        tokio::time::timeout(std::time::Duration::from_secs(1), gate.wait())
            .await
            .unwrap();

        let delivered = hub
            .publish(Key::parse("shelf.product.current").unwrap(), ShelfEvent::CurrentProduct(None))
            .await;
        assert_eq!(delivered, 1);

        task.abort();
    }
}
