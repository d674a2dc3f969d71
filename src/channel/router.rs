#![forbid(unsafe_code)]

// Message router - classify inbound channel frames

use crate::protocol::{ChannelIdentity, ServerFrame};
use crate::session::SessionId;

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Identity(ChannelIdentity),
    Progress { session: SessionId, response: String },
    /// Neither shape; ignored so newer backends can add frame kinds
    Unknown,
}

pub fn classify(text: &str) -> Frame {
    match serde_json::from_str::<ServerFrame>(text) {
        Ok(ServerFrame::Identity { channel_id }) => Frame::Identity(channel_id),
        Ok(ServerFrame::Progress { session, response }) => match SessionId::new(session) {
            Some(session) => Frame::Progress { session, response },
            None => Frame::Unknown,
        },
        Err(_) => Frame::Unknown,
    }
}
