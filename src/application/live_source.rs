// Live subscription traits for realtime parameter updates
use crate::domain::live::LiveMessage;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionAction {
    Replace,
    Add,
}

impl SubscriptionAction {
    pub fn as_wire(&self) -> &'static str {
        match self {
            SubscriptionAction::Replace => "REPLACE",
            SubscriptionAction::Add => "ADD",
        }
    }
}

/// Parameter set change sent on a live channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub parameters: Vec<String>,
    pub action: SubscriptionAction,
    pub send_from_cache: bool,
    pub update_on_expiration: bool,
    pub abort_on_invalid: bool,
}

impl SubscriptionRequest {
    fn with_action(parameters: Vec<String>, action: SubscriptionAction) -> Self {
        Self {
            parameters,
            action,
            send_from_cache: false,
            update_on_expiration: true,
            abort_on_invalid: true,
        }
    }

    pub fn replace(parameters: Vec<String>) -> Self {
        Self::with_action(parameters, SubscriptionAction::Replace)
    }

    pub fn add(parameters: Vec<String>) -> Self {
        Self::with_action(parameters, SubscriptionAction::Add)
    }
}

/// Outgoing half of an open subscription
pub trait LiveChannel: Send + Sync {
    fn send(&self, request: SubscriptionRequest) -> anyhow::Result<()>;

    /// Safe to call any number of times
    fn close(&self);
}

pub struct LiveSubscription {
    pub channel: Box<dyn LiveChannel>,
    pub messages: mpsc::UnboundedReceiver<LiveMessage>,
}

pub trait LiveSource: Send + Sync {
    /// Open a subscription; messages arrive asynchronously on the returned receiver
    fn open(&self, request: SubscriptionRequest) -> anyhow::Result<LiveSubscription>;
}
