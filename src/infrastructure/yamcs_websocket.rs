// Yamcs websocket client for live parameter subscriptions
use crate::application::live_source::{
    LiveChannel, LiveSource, LiveSubscription, SubscriptionAction, SubscriptionRequest,
};
use crate::domain::live::LiveMessage;
use crate::infrastructure::yamcs_mapper::{WireParameterData, parameter_data_to_domain};
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone)]
pub struct YamcsLiveSource {
    ws_url: String,
    instance: String,
    processor: String,
}

impl YamcsLiveSource {
    pub fn new(url: &str, instance: String, processor: String) -> Self {
        let base = url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        Self {
            ws_url: format!("{}/api/websocket", ws_base),
            instance,
            processor,
        }
    }
}

enum Outgoing {
    Subscribe(SubscriptionRequest),
    Close,
}

struct YamcsChannel {
    outgoing: mpsc::UnboundedSender<Outgoing>,
    closed: AtomicBool,
}

impl LiveChannel for YamcsChannel {
    fn send(&self, request: SubscriptionRequest) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            anyhow::bail!("live channel is closed");
        }
        self.outgoing
            .send(Outgoing::Subscribe(request))
            .map_err(|_| anyhow::anyhow!("live session has ended"))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.outgoing.send(Outgoing::Close);
        }
    }
}

impl LiveSource for YamcsLiveSource {
    fn open(&self, request: SubscriptionRequest) -> Result<LiveSubscription> {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (messages_tx, messages_rx) = mpsc::unbounded_channel();
        outgoing_tx
            .send(Outgoing::Subscribe(request))
            .map_err(|_| anyhow::anyhow!("live session has ended"))?;

        let session = Session {
            ws_url: self.ws_url.clone(),
            instance: self.instance.clone(),
            processor: self.processor.clone(),
            call: None,
            next_id: 1,
            pending: Vec::new(),
        };
        tokio::spawn(async move {
            let url = session.ws_url.clone();
            match session.run(outgoing_rx, messages_tx).await {
                Ok(()) => tracing::info!(%url, "Live session closed"),
                Err(e) => tracing::error!(%url, error = %e, "Live session failed"),
            }
        });

        Ok(LiveSubscription {
            channel: Box::new(YamcsChannel {
                outgoing: outgoing_tx,
                closed: AtomicBool::new(false),
            }),
            messages: messages_rx,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ServerFrame {
    #[serde(rename = "type")]
    kind: String,
    call: Option<u64>,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, PartialEq)]
enum Incoming {
    /// Server acknowledged a subscribe and assigned it a call id
    Reply(u64),
    Parameters(LiveMessage),
    Ignored,
}

fn parse_frame(text: &str) -> Result<Incoming> {
    let frame: ServerFrame = serde_json::from_str(text).context("Malformed websocket frame")?;
    match (frame.kind.as_str(), frame.call) {
        ("reply", Some(call)) => Ok(Incoming::Reply(call)),
        ("parameters", _) => {
            let data: WireParameterData =
                serde_json::from_value(frame.data).context("Malformed parameter data")?;
            Ok(Incoming::Parameters(parameter_data_to_domain(data)))
        }
        _ => Ok(Incoming::Ignored),
    }
}

/// State of one websocket connection carrying a single parameter subscription
struct Session {
    ws_url: String,
    instance: String,
    processor: String,
    call: Option<u64>,
    next_id: u64,
    /// Additions requested before the server assigned a call id
    pending: Vec<SubscriptionRequest>,
}

impl Session {
    fn subscribe_frame(&mut self, request: &SubscriptionRequest) -> String {
        let ids: Vec<serde_json::Value> = request
            .parameters
            .iter()
            .map(|name| serde_json::json!({ "name": name }))
            .collect();
        let mut frame = serde_json::json!({
            "type": "parameters",
            "id": self.next_id,
            "options": {
                "instance": self.instance,
                "processor": self.processor,
                "id": ids,
                "sendFromCache": request.send_from_cache,
                "updateOnExpiration": request.update_on_expiration,
                "abortOnInvalid": request.abort_on_invalid,
                "action": request.action.as_wire(),
            }
        });
        if request.action == SubscriptionAction::Add {
            if let Some(call) = self.call {
                frame["call"] = serde_json::json!(call);
            }
        }
        self.next_id += 1;
        frame.to_string()
    }

    async fn run(
        mut self,
        mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
        messages: mpsc::UnboundedSender<LiveMessage>,
    ) -> Result<()> {
        let (ws, _) = tokio_tungstenite::connect_async(self.ws_url.as_str())
            .await
            .context("Failed to connect to Yamcs websocket")?;
        tracing::info!(url = %self.ws_url, "Live session connected");
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                out = outgoing.recv() => match out {
                    Some(Outgoing::Subscribe(request)) => {
                        if request.action == SubscriptionAction::Add && self.call.is_none() {
                            self.pending.push(request);
                        } else {
                            let frame = self.subscribe_frame(&request);
                            sink.send(Message::Text(frame)).await?;
                        }
                    }
                    Some(Outgoing::Close) | None => {
                        let _ = sink.send(Message::Close(None)).await;
                        return Ok(());
                    }
                },
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => match parse_frame(&text)? {
                        Incoming::Reply(call) => {
                            if self.call.is_none() {
                                self.call = Some(call);
                                for request in std::mem::take(&mut self.pending) {
                                    let frame = self.subscribe_frame(&request);
                                    sink.send(Message::Text(frame)).await?;
                                }
                            }
                        }
                        Incoming::Parameters(message) => {
                            if messages.send(message).is_err() {
                                return Ok(());
                            }
                        }
                        Incoming::Ignored => {}
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            ws_url: "ws://localhost:8090/api/websocket".to_string(),
            instance: "simulator".to_string(),
            processor: "realtime".to_string(),
            call: None,
            next_id: 1,
            pending: Vec::new(),
        }
    }

    #[test]
    fn test_ws_url_from_http() {
        let source = YamcsLiveSource::new("https://yamcs.example.org/", "i".to_string(), "p".to_string());
        assert_eq!(source.ws_url, "wss://yamcs.example.org/api/websocket");
    }

    #[test]
    fn test_replace_frame() {
        let mut session = session();
        let frame = session.subscribe_frame(&SubscriptionRequest::replace(vec!["/P1".to_string()]));
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value["type"], "parameters");
        assert_eq!(value["id"], 1);
        assert_eq!(value["options"]["action"], "REPLACE");
        assert_eq!(value["options"]["id"][0]["name"], "/P1");
        assert_eq!(value["options"]["sendFromCache"], false);
        assert_eq!(value["options"]["updateOnExpiration"], true);
        assert!(value.get("call").is_none());
    }

    #[test]
    fn test_add_frame_targets_call() {
        let mut session = session();
        session.call = Some(7);
        let frame = session.subscribe_frame(&SubscriptionRequest::add(vec!["/P2".to_string()]));
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value["call"], 7);
        assert_eq!(value["options"]["action"], "ADD");
    }

    #[test]
    fn test_parse_reply_and_data_frames() {
        let reply = r#"{"type":"reply","call":4,"data":{"@type":"/yamcs.api.Reply","replyTo":1}}"#;
        assert_eq!(parse_frame(reply).unwrap(), Incoming::Reply(4));

        let data = r#"{"type":"parameters","call":4,"seq":1,"data":{
            "@type":"/yamcs.protobuf.processing.SubscribeParametersData",
            "mapping":{"1":{"name":"/P1"}},
            "values":[{"numericId":1,"engValue":{"type":"DOUBLE","doubleValue":2.5},
                       "acquisitionStatus":"ACQUIRED","generationTime":"2024-03-01T10:00:00Z"}]
        }}"#;
        match parse_frame(data).unwrap() {
            Incoming::Parameters(message) => {
                assert_eq!(message.id_mapping.get(&1).map(String::as_str), Some("/P1"));
                assert_eq!(message.values.len(), 1);
            }
            other => panic!("unexpected frame {:?}", other),
        }

        assert_eq!(parse_frame(r#"{"type":"pong"}"#).unwrap(), Incoming::Ignored);
    }
}
