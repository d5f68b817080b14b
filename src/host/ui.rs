//! Form descriptions handed to the host UI presenter and the responses it returns.

use std::time::Duration;

use log::debug;

use super::{HostError, UiPresenter};

#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    TextField {
        label: String,
        placeholder: String,
        default: Option<String>,
    },
    Slider {
        label: String,
        min: i64,
        max: i64,
        step: i64,
        default: i64,
    },
    Toggle {
        label: String,
        default: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    /// Input fields, submitted together.
    Modal { title: String, fields: Vec<FormField> },
    /// A list of buttons; the response is the chosen index.
    Action {
        title: String,
        body: String,
        buttons: Vec<String>,
    },
    /// Two-button confirm dialog.
    Message {
        title: String,
        body: String,
        confirm: String,
        cancel: String,
    },
}

impl Form {
    pub fn title(&self) -> &str {
        match self {
            Form::Modal { title, .. } | Form::Action { title, .. } | Form::Message { title, .. } => {
                title
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    Number(i64),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    UserClosed,
    /// Another form was already open for the player; retry shortly.
    UserBusy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormResponse {
    Modal(Vec<FormValue>),
    Action(usize),
    Message(bool),
    Cancelled(CancelReason),
}

/// Show a form, retrying while the player is busy with another form.
pub async fn show_form_retrying<U: UiPresenter + ?Sized>(
    ui: &U,
    player: &str,
    form: &Form,
    attempts: u32,
    retry_delay: Duration,
) -> Result<FormResponse, HostError> {
    let mut remaining = attempts.max(1);
    loop {
        let response = ui.show_form(player, form).await?;
        remaining -= 1;
        match response {
            FormResponse::Cancelled(CancelReason::UserBusy) if remaining > 0 => {
                debug!("form '{}' busy for {}, retrying", form.title(), player);
                tokio::time::sleep(retry_delay).await;
            }
            other => return Ok(other),
        }
    }
}
