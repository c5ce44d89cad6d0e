// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::messages::{
    CeaseErrorSubcode, ErrorCode, ErrorSubcode, FsmErrorSubcode,
    HeaderErrorSubcode, NotificationMessage, OpenErrorSubcode,
    UpdateErrorSubcode,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("too small: {0}")]
    TooSmall(String),

    #[error("too large: {0}")]
    TooLarge(String),

    /// A protocol error that maps onto a NOTIFICATION message per RFC 4271
    /// §6. The data field is echoed into the notification.
    #[error("protocol error: {code:?}/{subcode:?}")]
    Protocol {
        code: ErrorCode,
        subcode: ErrorSubcode,
        data: Vec<u8>,
    },

    /// The host output handler refused a write.
    #[error("transport failure")]
    Transport,
}

impl Error {
    pub fn header(subcode: HeaderErrorSubcode, data: Vec<u8>) -> Self {
        Error::Protocol {
            code: ErrorCode::Header,
            subcode: ErrorSubcode::Header(subcode),
            data,
        }
    }

    pub fn open(subcode: OpenErrorSubcode, data: Vec<u8>) -> Self {
        Error::Protocol {
            code: ErrorCode::Open,
            subcode: ErrorSubcode::Open(subcode),
            data,
        }
    }

    pub fn update(subcode: UpdateErrorSubcode, data: Vec<u8>) -> Self {
        Error::Protocol {
            code: ErrorCode::Update,
            subcode: ErrorSubcode::Update(subcode),
            data,
        }
    }

    pub fn hold_timer_expired() -> Self {
        Error::Protocol {
            code: ErrorCode::HoldTimerExpired,
            subcode: ErrorSubcode::HoldTimer,
            data: Vec::new(),
        }
    }

    pub fn fsm(subcode: FsmErrorSubcode) -> Self {
        Error::Protocol {
            code: ErrorCode::Fsm,
            subcode: ErrorSubcode::Fsm(subcode),
            data: Vec::new(),
        }
    }

    pub fn cease(subcode: CeaseErrorSubcode) -> Self {
        Error::Protocol {
            code: ErrorCode::Cease,
            subcode: ErrorSubcode::Cease(subcode),
            data: Vec::new(),
        }
    }

    /// The NOTIFICATION this error maps to, if any. Buffer-size and
    /// transport errors are local conditions and have no wire form.
    pub fn to_notification(&self) -> Option<NotificationMessage> {
        match self {
            Error::Protocol {
                code,
                subcode,
                data,
            } => Some(NotificationMessage {
                error_code: *code as u8,
                error_subcode: subcode.as_u8(),
                data: data.clone(),
            }),
            _ => None,
        }
    }
}
