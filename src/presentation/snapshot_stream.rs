// Server-sent event stream of published plot snapshots
use crate::application::plot_data_source::PlotDataSource;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};

/// `data` events carry each snapshot published by the tick, `loading` events every
/// loading transition and `notice` events error notices. The stream ends when the
/// plot is disposed; `None` if it already is.
pub fn plot_events(
    plot: &PlotDataSource,
) -> Option<Sse<impl Stream<Item = Result<Event, axum::Error>> + Send + 'static>> {
    let mut snapshots = WatchStream::new(plot.data()?);
    let mut loading = WatchStream::new(plot.loading()?);
    let mut notices = BroadcastStream::new(plot.notifications()?);

    let stream = async_stream::stream! {
        loop {
            let event = tokio::select! {
                snapshot = snapshots.next() => match snapshot {
                    Some(data) => Event::default().event("data").json_data(&*data),
                    None => break,
                },
                Some(busy) = loading.next() => Event::default().event("loading").json_data(busy),
                Some(notice) = notices.next() => match notice {
                    Ok(text) => Ok(Event::default().event("notice").data(text)),
                    // Lagged receivers skip missed notices
                    Err(_) => continue,
                },
            };
            yield event;
        }
    };

    Some(Sse::new(stream).keep_alive(KeepAlive::default()))
}
