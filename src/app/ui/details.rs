use eframe::egui::{self, RichText, Ui};

use crate::util::{format_amount, short_id};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(key) = self.selected else {
            ui.label("Click a block to list its transactions.");
            return;
        };

        let Some(selection) = self.viz.selection(key) else {
            ui.label("Selected block is outside the current ranking.");
            return;
        };

        match &selection.to {
            Some(to) => {
                ui.label(RichText::new(format!(
                    "{} -> {}",
                    short_id(selection.from.as_str()),
                    short_id(to.as_str())
                ))
                .strong());
                ui.small(format!("from {}", selection.from));
                ui.small(format!("to {to}"));
            }
            None => {
                ui.label(RichText::new(short_id(selection.from.as_str())).strong());
                ui.small(selection.from.as_str());
                ui.label("All received transactions");
            }
        }

        ui.add_space(6.0);
        ui.label(format!("Grid position: row {}, column {}", key.row, key.col));
        if let Some(rank) = self.viz.rank_of(&selection.from) {
            ui.label(format!("Rank of {}: #{}", short_id(selection.from.as_str()), rank + 1));
        }
        if let Some(to) = &selection.to {
            ui.label(format!(
                "Directed count: {}",
                self.viz.store().pair_count(&selection.from, to)
            ));
        }
        if let Some(block) = self.viz.blocks().get(key) {
            ui.label(format!("Block value: {}", format_amount(block.raw_value)));
        }
        ui.label(format!("Transactions: {}", selection.transactions.len()));
        ui.label(format!("Total: {}", format_amount(selection.total())));

        ui.separator();
        ui.label(RichText::new("Transactions (newest first)").strong());

        if !selection.has_visible() {
            ui.label("Amount: NA");
            return;
        }

        let rows = selection.visible().collect::<Vec<_>>();

        let row_count = rows.len().min(self.transaction_rows_visible);
        let mut should_load_more = false;

        egui::ScrollArea::vertical()
            .id_salt("transactions_scroll")
            .auto_shrink([false, false])
            .show_rows(ui, 20.0, row_count, |ui, row_range| {
                if row_range.end + Self::TRANSACTION_PREFETCH_MARGIN >= row_count {
                    should_load_more = true;
                }

                for index in row_range {
                    let Some(tx) = rows.get(index) else {
                        continue;
                    };
                    let label = format!(
                        "{}  {} -> {}  Amount: {}",
                        tx.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        short_id(tx.from.as_str()),
                        short_id(tx.to.as_str()),
                        format_amount(tx.amount)
                    );
                    ui.label(label)
                        .on_hover_text(format!("{} -> {}", tx.from, tx.to));
                }
            });

        if should_load_more && row_count < rows.len() {
            self.transaction_rows_visible += Self::TRANSACTION_PAGE_ROWS;
            ui.ctx().request_repaint();
        }
    }
}
