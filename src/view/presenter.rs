//! Drives the views from the aggregator's notifications

use super::format::{chart_title, HeaderDisplay, ListRow, SeriesPoint};
use crate::aggregator::{
    ConnectionState, DashboardEvent, HeaderUpdate, ListUpdate, RenderUpdate, YBounds,
};
use crate::feed::Symbol;
use crate::ws::WsError;
use tokio::sync::mpsc;

/// Symbol roster UI
pub trait ListView {
    /// A symbol's latest price; called for every tick
    fn update(&mut self, row: ListRow);

    /// A symbol's connection changed state
    fn connection_changed(&mut self, _symbol: &Symbol, _state: ConnectionState) {}

    /// A symbol's stream reported an error
    fn stream_error(&mut self, _symbol: &Symbol, _error: &WsError) {}
}

/// Detail header for the selected symbol
pub trait HeaderView {
    fn show(&mut self, header: HeaderDisplay);
}

/// Chart of the selected symbol's history
pub trait RenderSurface {
    /// Draw a series, oldest first; `series` may be empty, in which case
    /// `bounds` is `None`
    fn render(&mut self, series: &[SeriesPoint], bounds: Option<YBounds>, title: &str);

    /// Remove the chart
    fn clear(&mut self) {
        self.render(&[], None, "");
    }
}

/// Formats dashboard events and hands them to the views
pub struct Presenter<L, H, R> {
    list: L,
    header: H,
    surface: R,
}

impl<L, H, R> Presenter<L, H, R>
where
    L: ListView,
    H: HeaderView,
    R: RenderSurface,
{
    pub fn new(list: L, header: H, surface: R) -> Self {
        Self {
            list,
            header,
            surface,
        }
    }

    /// Apply one event to the views
    pub fn dispatch(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::List(ListUpdate {
                symbol,
                price,
                change_pct,
            }) => self.list.update(ListRow::new(symbol, price, change_pct)),
            DashboardEvent::Header(HeaderUpdate::Quote {
                symbol,
                price,
                change_pct,
            }) => self
                .header
                .show(HeaderDisplay::quote(symbol, price, change_pct)),
            DashboardEvent::Header(HeaderUpdate::Cleared) => {
                self.header.show(HeaderDisplay::cleared())
            }
            DashboardEvent::Render(RenderUpdate::Series {
                symbol,
                ticks,
                y_bounds,
            }) => {
                let series: Vec<SeriesPoint> = ticks.iter().map(SeriesPoint::from).collect();
                self.surface
                    .render(&series, y_bounds, &chart_title(&symbol));
            }
            DashboardEvent::Render(RenderUpdate::Cleared) => self.surface.clear(),
            DashboardEvent::Connection { symbol, state } => {
                self.list.connection_changed(&symbol, state)
            }
            DashboardEvent::StreamError { symbol, error } => {
                self.list.stream_error(&symbol, &error)
            }
        }
    }

    /// Dispatch events until the aggregator goes away, then return the views
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<DashboardEvent>) -> (L, H, R) {
        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }
        tracing::debug!("Dashboard event stream ended");
        (self.list, self.header, self.surface)
    }

    pub fn into_views(self) -> (L, H, R) {
        (self.list, self.header, self.surface)
    }
}
