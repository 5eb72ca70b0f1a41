use crate::domain::cart::{Cart, CartId};
use crate::domain::catalog::split_item_id;
use crate::domain::checkout::CheckoutOutcome;
use crate::error::Result;
use std::io::Write;

/// Writes the end-of-session report as CSV: checkout outcomes first, then the
/// remaining cart lines, each table with its own header.
pub struct SummaryWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SummaryWriter<W> {
    pub fn new(sink: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(sink);
        Self { writer }
    }

    pub fn write_outcomes(&mut self, outcomes: &[CheckoutOutcome]) -> Result<()> {
        self.writer.write_record(["checkout", "outcome"])?;
        for outcome in outcomes {
            self.writer
                .write_record([outcome.checkout().as_str(), outcome.state().as_str()])?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_carts(&mut self, carts: &[(CartId, Cart)]) -> Result<()> {
        self.writer
            .write_record(["cart", "variant", "quantity", "line_total"])?;
        for (cart_id, cart) in carts {
            for line in cart.lines() {
                let quantity = line.quantity.to_string();
                let total = line.line_total().to_string();
                self.writer.write_record([
                    cart_id.as_str(),
                    split_item_id(&line.variant_id),
                    quantity.as_str(),
                    total.as_str(),
                ])?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}
