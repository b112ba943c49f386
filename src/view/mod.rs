//! Presentation adapter
//!
//! Turns [`crate::aggregator::DashboardEvent`]s into formatted calls on the
//! UI shell's list, header and chart widgets.

mod format;
mod presenter;

pub use format::{
    chart_title, format_change, format_price, time_label, HeaderDisplay, ListRow, SeriesPoint,
};
pub use presenter::{HeaderView, ListView, Presenter, RenderSurface};
