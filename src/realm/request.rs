//! Two-party requests that need an explicit answer.
//!
//! A responder holds at most one pending request. Requests leave the book as soon
//! as they are accepted, rejected or expired; no history is kept. Every request gets
//! a fresh id, and `expire` only acts when the pending request still carries the id
//! the timer was armed with, so a late timer can never touch a newer request.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub id: RequestId,
    pub requester: String,
    pub responder: String,
    pub created_at: DateTime<Utc>,
}

/// A request that left the pending state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub request: PendingRequest,
    pub state: RequestState,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("{responder} already has a pending request")]
    AlreadyPending { responder: String },

    #[error("no pending request for {responder}")]
    NotFound { responder: String },
}

#[derive(Debug, Default)]
pub struct RequestBook {
    next_id: RequestId,
    pending: HashMap<String, PendingRequest>,
}

impl RequestBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pending request; the caller arms the expiry timer with the returned id.
    pub fn send(
        &mut self,
        requester: &str,
        responder: &str,
        now: DateTime<Utc>,
    ) -> Result<RequestId, RequestError> {
        if self.pending.contains_key(responder) {
            return Err(RequestError::AlreadyPending {
                responder: responder.to_string(),
            });
        }
        self.next_id += 1;
        let id = self.next_id;
        self.pending.insert(
            responder.to_string(),
            PendingRequest {
                id,
                requester: requester.to_string(),
                responder: responder.to_string(),
                created_at: now,
            },
        );
        Ok(id)
    }

    pub fn respond(&mut self, responder: &str, accept: bool) -> Result<Resolution, RequestError> {
        let request = self
            .pending
            .remove(responder)
            .ok_or_else(|| RequestError::NotFound {
                responder: responder.to_string(),
            })?;
        let state = if accept {
            RequestState::Accepted
        } else {
            RequestState::Rejected
        };
        Ok(Resolution { request, state })
    }

    /// Expire the request `id` if it is still pending. Returns None otherwise.
    pub fn expire(&mut self, responder: &str, id: RequestId) -> Option<Resolution> {
        match self.pending.get(responder) {
            Some(req) if req.id == id => {}
            _ => return None,
        }
        self.pending.remove(responder).map(|request| Resolution {
            request,
            state: RequestState::Expired,
        })
    }

    pub fn pending_for(&self, responder: &str) -> Option<&PendingRequest> {
        self.pending.get(responder)
    }

    /// Pending requests sent by `requester`, oldest first.
    pub fn sent_by(&self, requester: &str) -> Vec<&PendingRequest> {
        let mut out: Vec<_> = self
            .pending
            .values()
            .filter(|r| r.requester == requester)
            .collect();
        out.sort_by_key(|r| r.id);
        out
    }

    /// Drop every request the player sent or must answer.
    pub fn cancel_involving(&mut self, player: &str) -> Vec<PendingRequest> {
        let keys: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, r)| r.requester == player || r.responder == player)
            .map(|(k, _)| k.clone())
            .collect();
        let mut dropped: Vec<_> = keys
            .iter()
            .filter_map(|k| self.pending.remove(k))
            .collect();
        dropped.sort_by_key(|r| r.id);
        dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_to_same_responder_is_refused() {
        let mut book = RequestBook::new();
        let now = Utc::now();
        book.send("alex", "bo", now).unwrap();
        assert_eq!(
            book.send("cy", "bo", now),
            Err(RequestError::AlreadyPending {
                responder: "bo".into()
            })
        );
        assert_eq!(book.pending_for("bo").unwrap().requester, "alex");
    }

    #[test]
    fn respond_removes_request() {
        let mut book = RequestBook::new();
        book.send("alex", "bo", Utc::now()).unwrap();
        let res = book.respond("bo", false).unwrap();
        assert_eq!(res.state, RequestState::Rejected);
        assert_eq!(res.request.requester, "alex");
        assert!(book.is_empty());
        assert!(matches!(
            book.respond("bo", true),
            Err(RequestError::NotFound { .. })
        ));
    }

    #[test]
    fn stale_expiry_does_not_touch_newer_request() {
        let mut book = RequestBook::new();
        let now = Utc::now();
        let first = book.send("alex", "bo", now).unwrap();
        book.respond("bo", true).unwrap();
        let second = book.send("cy", "bo", now).unwrap();
        assert_ne!(first, second);
        assert_eq!(book.expire("bo", first), None);
        assert_eq!(book.pending_for("bo").unwrap().requester, "cy");
        let expired = book.expire("bo", second).unwrap();
        assert_eq!(expired.state, RequestState::Expired);
        assert_eq!(book.expire("bo", second), None);
    }

    #[test]
    fn cancel_involving_drops_both_directions() {
        let mut book = RequestBook::new();
        let now = Utc::now();
        book.send("alex", "bo", now).unwrap();
        book.send("cy", "alex", now).unwrap();
        book.send("cy", "dee", now).unwrap();
        let dropped = book.cancel_involving("alex");
        assert_eq!(dropped.len(), 2);
        assert_eq!(book.len(), 1);
        assert_eq!(book.sent_by("cy").len(), 1);
    }
}
