// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use bgp_types::Prefix4;
use num_enum::TryFromPrimitive;
use slog::{warn, Logger};
use std::fmt::{self, Display, Formatter};
use std::net::Ipv4Addr;

/// BGP message types.
///
/// Ref: RFC 4271 §4.1
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Copy, Clone)]
#[repr(u8)]
pub enum MessageType {
    /// The first message sent by each side once a connection is established.
    ///
    /// RFC 4271 §4.2
    Open = 1,

    /// Used to transfer routing information between BGP peers.
    ///
    /// RFC 4271 §4.3
    Update = 2,

    /// Sent when an error condition is detected.
    ///
    /// RFC 4271 §4.5
    Notification = 3,

    /// Exchanged between peers often enough not to cause the hold timer to
    /// expire.
    ///
    /// RFC 4271 §4.4
    KeepAlive = 4,
}

/// According to RFC 4271 §4.1 the header marker is all ones.
pub const MARKER: [u8; 16] = [0xffu8; 16];

/// The autonomous system number used in OPEN messages and AS_PATH attributes
/// when a 4-byte ASN does not fit a 2-byte encoding.
///
/// Ref: RFC 6793 §9
pub const AS_TRANS: u16 = 23456;

/// The version number for BGP-4.
pub const BGP4: u8 = 4;

/// Maximum total message length including the header.
pub const MAX_MESSAGE_SIZE: usize = 4096;

/// Wire size of the fixed message header.
pub const HEADER_SIZE: usize = 19;

/// Each BGP message has a fixed sized header.
///
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |                                                               |
///   +                                                               +
///   |                                                               |
///   +                                                               +
///   |                           Marker                              |
///   +                                                               +
///   |                                                               |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |          Length               |      Type     |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// This object contains the length and type fields. The marker is generated
/// by [`Header::to_wire`] and validated by [`Header::from_wire`].
///
/// Ref: RFC 4271 §4.1
#[derive(Debug, PartialEq, Eq)]
pub struct Header {
    /// Total length of the message, including the header. May be no larger
    /// than 4096.
    pub length: u16,

    /// Indicates the type of message.
    pub typ: MessageType,
}

impl Header {
    /// Create a new BGP message header. Length must be between 19 and 4096
    /// per RFC 4271 §4.1.
    pub fn new(length: u16, typ: MessageType) -> Result<Header, Error> {
        if (length as usize) < HEADER_SIZE {
            return Err(Error::TooSmall("message header length".into()));
        }
        if length as usize > MAX_MESSAGE_SIZE {
            return Err(Error::TooLarge("message header length".into()));
        }
        Ok(Header { length, typ })
    }

    /// Serialize the header to wire format.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = MARKER.to_vec();
        buf.extend_from_slice(&self.length.to_be_bytes());
        buf.push(self.typ as u8);
        buf
    }

    /// Deserialize a header from wire format.
    pub fn from_wire(buf: &[u8]) -> Result<Header, Error> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::TooSmall("message header".into()));
        }
        if buf[..16] != MARKER {
            return Err(Error::header(
                HeaderErrorSubcode::ConnectionNotSynchronized,
                Vec::new(),
            ));
        }

        let length = u16::from_be_bytes([buf[16], buf[17]]);
        if (length as usize) < HEADER_SIZE
            || length as usize > MAX_MESSAGE_SIZE
        {
            // The erroneous length is echoed in the notification data.
            return Err(Error::header(
                HeaderErrorSubcode::BadMessageLength,
                length.to_be_bytes().to_vec(),
            ));
        }

        let typ = match MessageType::try_from(buf[18]) {
            Ok(typ) => typ,
            Err(_) => {
                return Err(Error::header(
                    HeaderErrorSubcode::BadMessageType,
                    vec![buf[18]],
                ));
            }
        };

        Ok(Header { length, typ })
    }
}

/// A full BGP message.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Message {
    Open(OpenMessage),
    Update(UpdateMessage),
    Notification(NotificationMessage),
    KeepAlive,
}

impl From<OpenMessage> for Message {
    fn from(m: OpenMessage) -> Message {
        Message::Open(m)
    }
}

impl From<UpdateMessage> for Message {
    fn from(m: UpdateMessage) -> Message {
        Message::Update(m)
    }
}

impl From<NotificationMessage> for Message {
    fn from(m: NotificationMessage) -> Message {
        Message::Notification(m)
    }
}

impl Message {
    pub fn title(&self) -> &'static str {
        match self {
            Message::Open(_) => "open",
            Message::Update(_) => "update",
            Message::Notification(_) => "notification",
            Message::KeepAlive => "keepalive",
        }
    }

    /// Serialize a message to wire format, header included.
    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        let (typ, body) = match self {
            Message::Open(m) => (MessageType::Open, m.to_wire()?),
            Message::Update(m) => (MessageType::Update, m.to_wire()?),
            Message::Notification(m) => {
                (MessageType::Notification, m.to_wire())
            }
            Message::KeepAlive => (MessageType::KeepAlive, Vec::new()),
        };
        let length = HEADER_SIZE + body.len();
        if length > MAX_MESSAGE_SIZE {
            return Err(Error::TooLarge("message".into()));
        }
        let header = Header::new(length as u16, typ)?;
        let mut buf = header.to_wire();
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Deserialize one message from wire format. The buffer must hold the
    /// complete message; returns the message and the bytes consumed.
    ///
    /// `four_byte` is the out-of-band AS_PATH width negotiated for the
    /// session (RFC 6793), it only influences UPDATE parsing.
    pub fn from_wire(
        buf: &[u8],
        four_byte: bool,
    ) -> Result<(Message, usize), Error> {
        let header = Header::from_wire(buf)?;
        let length = header.length as usize;
        if buf.len() < length {
            return Err(Error::TooSmall("message body".into()));
        }
        let body = &buf[HEADER_SIZE..length];
        let msg = match header.typ {
            MessageType::Open => OpenMessage::from_wire(body)?.into(),
            MessageType::Update => {
                UpdateMessage::from_wire(body, four_byte)?.into()
            }
            MessageType::Notification => {
                NotificationMessage::from_wire(body)?.into()
            }
            MessageType::KeepAlive => {
                // A KEEPALIVE is only the header.
                if !body.is_empty() {
                    return Err(Error::header(
                        HeaderErrorSubcode::BadMessageLength,
                        header.length.to_be_bytes().to_vec(),
                    ));
                }
                Message::KeepAlive
            }
        };
        Ok((msg, length))
    }
}

/// The first message sent by each side once a connection is established.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    Version    |     My Autonomous System      |   Hold Time   :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// :               |                BGP Identifier                 :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// :               | Opt Parm Len  |     Optional Parameters       :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// :                                                               :
/// :             Optional Parameters (cont, variable)              :
/// :                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Ref: RFC 4271 §4.2
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct OpenMessage {
    /// BGP protocol version.
    pub version: u8,

    /// Autonomous system number of the sender. When the sender's ASN does
    /// not fit in two bytes, this is AS_TRANS and the real ASN is carried in
    /// a four-octet-AS capability.
    ///
    /// Ref: RFC 6793 §9
    pub asn: u16,

    /// Number of seconds the sender proposes for the hold timer.
    pub hold_time: u16,

    /// BGP identifier of the sender.
    pub id: u32,

    /// A list of optional parameters.
    pub parameters: Vec<OptionalParameter>,
}

impl OpenMessage {
    /// Create a new open message for a sender with a 2-byte ASN.
    pub fn new2(asn: u16, hold_time: u16, id: u32) -> OpenMessage {
        OpenMessage {
            version: BGP4,
            asn,
            hold_time,
            id,
            parameters: Vec::new(),
        }
    }

    /// Create a new open message for a sender advertising the four-octet-AS
    /// capability. The ASN field carries the real ASN when it fits and
    /// AS_TRANS otherwise.
    pub fn new4(asn: u32, hold_time: u16, id: u32) -> OpenMessage {
        let wire_asn = if asn > u16::MAX as u32 {
            AS_TRANS
        } else {
            asn as u16
        };
        OpenMessage {
            version: BGP4,
            asn: wire_asn,
            hold_time,
            id,
            parameters: vec![Capability::FourOctetAs { asn }.into()],
        }
    }

    /// The ASN advertised through the four-octet-AS capability, if present.
    pub fn four_octet_asn(&self) -> Option<u32> {
        self.capabilities().find_map(|c| match c {
            Capability::FourOctetAs { asn } => Some(*asn),
            _ => None,
        })
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.parameters.iter().map(|p| match p {
            OptionalParameter::Capability(c) => c,
        })
    }

    /// Serialize an open message to wire format.
    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();

        // version
        buf.push(self.version);

        // as
        buf.extend_from_slice(&self.asn.to_be_bytes());

        // hold time
        buf.extend_from_slice(&self.hold_time.to_be_bytes());

        // id
        buf.extend_from_slice(&self.id.to_be_bytes());

        // opt param len
        let opt_buf = self.parameters_to_wire()?;
        if opt_buf.len() > u8::MAX as usize {
            return Err(Error::TooLarge("optional parameters".into()));
        }
        buf.push(opt_buf.len() as u8);
        buf.extend_from_slice(&opt_buf);

        Ok(buf)
    }

    fn parameters_to_wire(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        for p in &self.parameters {
            buf.extend_from_slice(&p.to_wire()?);
        }
        Ok(buf)
    }

    /// Deserialize an open message from wire format.
    pub fn from_wire(buf: &[u8]) -> Result<OpenMessage, Error> {
        if buf.len() < 10 {
            return Err(Error::header(
                HeaderErrorSubcode::BadMessageLength,
                vec![buf.len() as u8],
            ));
        }

        // version
        let version = buf[0];
        if version != BGP4 {
            // Data is the largest version number we support, as a u16.
            return Err(Error::open(
                OpenErrorSubcode::UnsupportedVersionNumber,
                (BGP4 as u16).to_be_bytes().to_vec(),
            ));
        }

        // as
        let asn = u16::from_be_bytes([buf[1], buf[2]]);

        // hold time
        let hold_time = u16::from_be_bytes([buf[3], buf[4]]);

        // id
        let id = u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]);

        // parameters
        let param_len = buf[9] as usize;
        if buf.len() < 10 + param_len {
            return Err(Error::open(
                OpenErrorSubcode::Unspecific,
                Vec::new(),
            ));
        }
        let parameters =
            Self::parameters_from_wire(&buf[10..10 + param_len])?;

        Ok(OpenMessage {
            version,
            asn,
            hold_time,
            id,
            parameters,
        })
    }

    fn parameters_from_wire(
        mut buf: &[u8],
    ) -> Result<Vec<OptionalParameter>, Error> {
        let mut result = Vec::new();

        while !buf.is_empty() {
            let (params, n) = OptionalParameter::from_wire(buf)?;
            result.extend(params);
            buf = &buf[n..];
        }

        Ok(result)
    }
}

/// Optional parameters carried in an OPEN message. Only the capability
/// parameter (RFC 5492) is assigned and in use; other parameter types are
/// rejected with an unsupported-optional-parameter error.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum OptionalParameter {
    /// Code 2: RFC 5492
    Capability(Capability),
}

/// RFC 5492 §4: the capability optional parameter has code 2.
pub const CAPABILITY_PARAMETER: u8 = 2;

impl From<Capability> for OptionalParameter {
    fn from(c: Capability) -> OptionalParameter {
        OptionalParameter::Capability(c)
    }
}

impl OptionalParameter {
    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        match self {
            Self::Capability(c) => {
                let mut buf = vec![CAPABILITY_PARAMETER];
                let cbuf = c.to_wire()?;
                if cbuf.len() > u8::MAX as usize {
                    return Err(Error::TooLarge("capability".into()));
                }
                buf.push(cbuf.len() as u8);
                buf.extend_from_slice(&cbuf);
                Ok(buf)
            }
        }
    }

    /// Parse one optional parameter. A single capability parameter may
    /// carry several capability TLVs, so this returns a list. The second
    /// element of the result is the bytes consumed.
    pub fn from_wire(
        buf: &[u8],
    ) -> Result<(Vec<OptionalParameter>, usize), Error> {
        if buf.len() < 2 {
            return Err(Error::open(OpenErrorSubcode::Unspecific, Vec::new()));
        }
        let code = buf[0];
        let len = buf[1] as usize;
        if buf.len() < 2 + len {
            return Err(Error::open(OpenErrorSubcode::Unspecific, Vec::new()));
        }

        if code != CAPABILITY_PARAMETER {
            return Err(Error::open(
                OpenErrorSubcode::UnsupportedOptionalParameter,
                vec![code],
            ));
        }

        let mut value = &buf[2..2 + len];
        let mut result = Vec::new();
        while !value.is_empty() {
            let (cap, n) = Capability::from_wire(value)?;
            result.push(cap.into());
            value = &value[n..];
        }

        Ok((result, 2 + len))
    }
}

/// Capability codes this implementation understands on the wire. Everything
/// else round-trips through [`Capability::Unknown`].
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Copy, Clone)]
#[repr(u8)]
pub enum CapabilityCode {
    /// RFC 2858
    MultiprotocolExtensions = 1,

    /// RFC 6793
    FourOctetAs = 65,
}

/// An OPEN message capability (RFC 5492).
#[derive(Debug, PartialEq, Eq, Clone, PartialOrd, Ord)]
pub enum Capability {
    /// RFC 2858. Parsed and preserved; this implementation always assumes
    /// IPv4 unicast NLRI regardless of what is advertised here.
    MultiprotocolExtensions { afi: u16, safi: u8 },

    /// RFC 6793
    FourOctetAs { asn: u32 },

    /// Anything unrecognized is preserved verbatim so it can be reflected.
    Unknown { code: u8, data: Vec<u8> },
}

impl Capability {
    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        match self {
            Self::MultiprotocolExtensions { afi, safi } => {
                let mut buf =
                    vec![CapabilityCode::MultiprotocolExtensions as u8, 4];
                buf.extend_from_slice(&afi.to_be_bytes());
                buf.push(0); // reserved
                buf.push(*safi);
                Ok(buf)
            }
            Self::FourOctetAs { asn } => {
                let mut buf = vec![CapabilityCode::FourOctetAs as u8, 4];
                buf.extend_from_slice(&asn.to_be_bytes());
                Ok(buf)
            }
            Self::Unknown { code, data } => {
                if data.len() > u8::MAX as usize {
                    return Err(Error::TooLarge("capability value".into()));
                }
                let mut buf = vec![*code, data.len() as u8];
                buf.extend_from_slice(data);
                Ok(buf)
            }
        }
    }

    pub fn from_wire(buf: &[u8]) -> Result<(Capability, usize), Error> {
        if buf.len() < 2 {
            return Err(Error::open(OpenErrorSubcode::Unspecific, Vec::new()));
        }
        let code = buf[0];
        let len = buf[1] as usize;
        if buf.len() < 2 + len {
            return Err(Error::open(OpenErrorSubcode::Unspecific, Vec::new()));
        }
        let value = &buf[2..2 + len];

        let cap = match CapabilityCode::try_from(code) {
            Ok(CapabilityCode::FourOctetAs) => {
                if len != 4 {
                    return Err(Error::open(
                        OpenErrorSubcode::Unspecific,
                        vec![code, len as u8],
                    ));
                }
                Capability::FourOctetAs {
                    asn: u32::from_be_bytes([
                        value[0], value[1], value[2], value[3],
                    ]),
                }
            }
            Ok(CapabilityCode::MultiprotocolExtensions) => {
                if len != 4 {
                    return Err(Error::open(
                        OpenErrorSubcode::Unspecific,
                        vec![code, len as u8],
                    ));
                }
                Capability::MultiprotocolExtensions {
                    afi: u16::from_be_bytes([value[0], value[1]]),
                    safi: value[3],
                }
            }
            Err(_) => Capability::Unknown {
                code,
                data: value.to_vec(),
            },
        };

        Ok((cap, 2 + len))
    }
}

/// An update message advertises feasible routes sharing common path
/// attributes, withdraws unfeasible ones, or both.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |        Withdrawn Length       |       Withdrawn Routes        :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    Path Attribute Length      |       Path Attributes         :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// :       Network Layer Reachability Information (variable)       :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Ref: RFC 4271 §4.3
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct UpdateMessage {
    pub withdrawn: Vec<Prefix4>,
    pub path_attributes: Vec<PathAttribute>,
    pub nlri: Vec<Prefix4>,
}

impl UpdateMessage {
    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();

        // withdrawn
        let withdrawn = prefixes_to_wire(&self.withdrawn)?;
        if withdrawn.len() > u16::MAX as usize {
            return Err(Error::TooLarge("withdrawn routes".into()));
        }
        buf.extend_from_slice(&(withdrawn.len() as u16).to_be_bytes());
        buf.extend_from_slice(&withdrawn);

        // path attributes
        let mut attrs = Vec::new();
        for p in &self.path_attributes {
            attrs.extend_from_slice(&p.to_wire()?);
        }
        if attrs.len() > u16::MAX as usize {
            return Err(Error::TooLarge("path attributes".into()));
        }
        buf.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
        buf.extend_from_slice(&attrs);

        // nlri
        buf.extend_from_slice(&prefixes_to_wire(&self.nlri)?);

        Ok(buf)
    }

    /// Parse an update message body. `four_byte` selects the AS_PATH and
    /// AGGREGATOR ASN width negotiated for the session.
    pub fn from_wire(
        buf: &[u8],
        four_byte: bool,
    ) -> Result<UpdateMessage, Error> {
        if buf.len() < 4 {
            return Err(Error::header(
                HeaderErrorSubcode::BadMessageLength,
                vec![buf.len() as u8],
            ));
        }

        // withdrawn
        let len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
        let buf = &buf[2..];
        if buf.len() < len + 2 {
            return Err(Error::update(
                UpdateErrorSubcode::Unspecific,
                Vec::new(),
            ));
        }
        let withdrawn = prefixes_from_wire(&buf[..len])?;
        let buf = &buf[len..];

        // path attributes
        let len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
        let buf = &buf[2..];
        if buf.len() < len {
            return Err(Error::update(
                UpdateErrorSubcode::MalformedAttributeList,
                Vec::new(),
            ));
        }
        let path_attributes = path_attrs_from_wire(&buf[..len], four_byte)?;
        let buf = &buf[len..];

        // nlri
        let nlri = prefixes_from_wire(buf)?;

        let update = UpdateMessage {
            withdrawn,
            path_attributes,
            nlri,
        };
        update.validate_attribs()?;
        Ok(update)
    }

    /// Validate the attribute list: each type code at most once, and the
    /// well-known mandatory attributes present whenever NLRI is carried.
    /// Withdraw-only updates legitimately carry no attributes.
    pub fn validate_attribs(&self) -> Result<(), Error> {
        let mut has_origin = false;
        let mut has_as_path = false;
        let mut has_nexthop = false;

        let mut typecode_bitmap = [0u64; 4];

        for attr in &self.path_attributes {
            let t = attr.typ.type_code;
            match PathAttributeTypeCode::try_from(t) {
                Ok(PathAttributeTypeCode::Origin) => has_origin = true,
                Ok(PathAttributeTypeCode::AsPath) => has_as_path = true,
                Ok(PathAttributeTypeCode::NextHop) => has_nexthop = true,
                _ => {}
            }

            let (word, bit) = (t as usize / 64, t as usize % 64);
            if typecode_bitmap[word] >> bit & 1 != 0 {
                return Err(Error::update(
                    UpdateErrorSubcode::MalformedAttributeList,
                    Vec::new(),
                ));
            }
            typecode_bitmap[word] |= 1 << bit;
        }

        if !self.nlri.is_empty()
            && !(has_origin && has_as_path && has_nexthop)
        {
            return Err(Error::update(
                UpdateErrorSubcode::MissingWellKnownAttribute,
                Vec::new(),
            ));
        }

        Ok(())
    }

    pub fn has_attrib(&self, code: PathAttributeTypeCode) -> bool {
        self.get_attrib(code).is_some()
    }

    pub fn get_attrib(
        &self,
        code: PathAttributeTypeCode,
    ) -> Option<&PathAttribute> {
        self.path_attributes
            .iter()
            .find(|a| a.typ.type_code == code as u8)
    }

    pub fn get_attrib_mut(
        &mut self,
        code: PathAttributeTypeCode,
    ) -> Option<&mut PathAttribute> {
        self.path_attributes
            .iter_mut()
            .find(|a| a.typ.type_code == code as u8)
    }

    pub fn drop_attrib(&mut self, code: PathAttributeTypeCode) -> bool {
        let before = self.path_attributes.len();
        self.path_attributes.retain(|a| a.typ.type_code != code as u8);
        self.path_attributes.len() != before
    }

    /// Replace an attribute of the same type code, or add it.
    pub fn update_attrib(&mut self, attr: PathAttribute) {
        self.path_attributes
            .retain(|a| a.typ.type_code != attr.typ.type_code);
        self.path_attributes.push(attr);
    }

    pub fn nexthop(&self) -> Option<Ipv4Addr> {
        match self.get_attrib(PathAttributeTypeCode::NextHop) {
            Some(PathAttribute {
                value: PathAttributeValue::NextHop(addr),
                ..
            }) => Some(*addr),
            _ => None,
        }
    }

    pub fn set_nexthop(&mut self, addr: Ipv4Addr) {
        self.update_attrib(PathAttribute::next_hop(addr));
    }

    pub fn as_path(&self) -> Option<&AsPath> {
        match self.get_attrib(PathAttributeTypeCode::AsPath) {
            Some(PathAttribute {
                value: PathAttributeValue::AsPath(p),
                ..
            }) => Some(p),
            _ => None,
        }
    }

    fn as_path_mut(&mut self) -> Option<&mut AsPath> {
        match self.get_attrib_mut(PathAttributeTypeCode::AsPath) {
            Some(PathAttribute {
                value: PathAttributeValue::AsPath(p),
                ..
            }) => Some(p),
            _ => None,
        }
    }

    /// Prepend an ASN to AS_PATH per RFC 4271 §5.1.2: grow the leading
    /// AS_SEQUENCE, or start a new one when the path is empty, leads with an
    /// AS_SET, or the leading segment is full.
    pub fn prepend(&mut self, asn: u32) {
        if self.as_path().is_none() {
            self.update_attrib(PathAttribute::as_path(AsPath {
                four_byte: true,
                segments: Vec::new(),
            }));
        }
        let path = self.as_path_mut().unwrap();
        match path.segments.first_mut() {
            Some(seg)
                if seg.typ == AsPathSegmentType::AsSequence
                    && seg.value.len() < 255 =>
            {
                seg.value.insert(0, asn);
            }
            _ => {
                path.segments.insert(
                    0,
                    AsPathSegment {
                        typ: AsPathSegmentType::AsSequence,
                        value: vec![asn],
                    },
                );
            }
        }
    }

    /// Recover 4-byte ASNs after receiving a 2-byte AS_PATH on a session
    /// that negotiated 4-byte ASNs: AS4_PATH sequence segments supply the
    /// real ASNs for each AS_TRANS in AS_PATH, then AS4_PATH is removed and
    /// the path becomes 4-byte. Divergence between the two attributes is
    /// logged, not fatal.
    ///
    /// Ref: RFC 6793 §4.2.3
    pub fn restore_as_path(&mut self, log: &Logger) {
        let full: Vec<u32> = match self.get_attrib(PathAttributeTypeCode::As4Path)
        {
            Some(PathAttribute {
                value: PathAttributeValue::As4Path(segs),
                ..
            }) => segs
                .iter()
                .filter(|s| s.typ == AsPathSegmentType::AsSequence)
                .flat_map(|s| s.value.iter().copied())
                .collect(),
            _ => {
                // No AS4_PATH. The path is already complete, just mark it
                // 4-byte wide.
                if let Some(path) = self.as_path_mut() {
                    if !path.four_byte {
                        if path
                            .segments
                            .iter()
                            .any(|s| s.value.contains(&(AS_TRANS as u32)))
                        {
                            warn!(
                                log,
                                "as_trans in as_path but no as4_path present"
                            );
                        }
                        path.four_byte = true;
                    }
                }
                return;
            }
        };

        let had_as_path = if let Some(path) = self.as_path_mut() {
            if path.four_byte {
                // Nothing to reconcile; a 4-byte session should not have
                // carried AS4_PATH in the first place.
                self.drop_attrib(PathAttributeTypeCode::As4Path);
                return;
            }

            // The usable tail of AS4_PATH starts at the first ASN that
            // cannot be expressed in two bytes.
            let start = full
                .iter()
                .position(|a| *a > u16::MAX as u32)
                .unwrap_or(full.len());
            let mut tail = full[start..].iter();
            let mut replacing = false;
            let mut diverged = false;

            for seg in &mut path.segments {
                for asn in &mut seg.value {
                    if *asn == AS_TRANS as u32 {
                        replacing = true;
                        match tail.next() {
                            Some(real) => *asn = *real,
                            None => diverged = true,
                        }
                    } else if replacing {
                        if let Some(real) = tail.next() {
                            if *real != *asn {
                                diverged = true;
                            }
                        }
                    }
                }
            }
            path.four_byte = true;

            if diverged {
                warn!(log, "as_path and as4_path do not agree");
            }
            true
        } else {
            false
        };

        if had_as_path {
            self.drop_attrib(PathAttributeTypeCode::As4Path);
        }
    }

    /// Produce the 2-byte rendition of AS_PATH for a peer that did not
    /// negotiate 4-byte ASNs: every ASN above the 2-byte range becomes
    /// AS_TRANS and the original path is carried in AS4_PATH.
    ///
    /// Ref: RFC 6793 §4.2.2
    pub fn downgrade_as_path(&mut self) {
        let path = match self.as_path_mut() {
            Some(p) if p.four_byte => p,
            _ => return,
        };

        let as4_segments = path.segments.clone();
        for seg in &mut path.segments {
            for asn in &mut seg.value {
                if *asn > u16::MAX as u32 {
                    *asn = AS_TRANS as u32;
                }
            }
        }
        path.four_byte = false;

        self.update_attrib(PathAttribute::as4_path(as4_segments));
    }

    /// AGGREGATOR analogue of [`UpdateMessage::restore_as_path`].
    pub fn restore_aggregator(&mut self) {
        let new = match self.get_attrib(PathAttributeTypeCode::As4Aggregator) {
            Some(PathAttribute {
                value: PathAttributeValue::As4Aggregator(a4),
                ..
            }) => Some((a4.asn, a4.addr)),
            _ => None,
        };

        let aggr = match self.get_attrib_mut(PathAttributeTypeCode::Aggregator)
        {
            Some(PathAttribute {
                value: PathAttributeValue::Aggregator(a),
                ..
            }) => a,
            _ => return,
        };
        aggr.four_byte = true;
        if let Some((asn, addr)) = new {
            aggr.asn = asn;
            aggr.addr = addr;
        }
        self.drop_attrib(PathAttributeTypeCode::As4Aggregator);
    }

    /// AGGREGATOR analogue of [`UpdateMessage::downgrade_as_path`].
    pub fn downgrade_aggregator(&mut self) {
        let (asn, addr) =
            match self.get_attrib_mut(PathAttributeTypeCode::Aggregator) {
                Some(PathAttribute {
                    value: PathAttributeValue::Aggregator(a),
                    ..
                }) => {
                    let original = (a.asn, a.addr);
                    a.four_byte = false;
                    if a.asn > u16::MAX as u32 {
                        a.asn = AS_TRANS as u32;
                    }
                    original
                }
                _ => return,
            };

        self.update_attrib(PathAttribute::as4_aggregator(As4Aggregator {
            asn,
            addr,
        }));
    }
}

fn prefixes_to_wire(prefixes: &[Prefix4]) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    for p in prefixes {
        buf.push(p.length);
        let n = (p.length as usize + 7) / 8;
        buf.extend_from_slice(&p.value.octets()[..n]);
    }
    Ok(buf)
}

fn prefixes_from_wire(mut buf: &[u8]) -> Result<Vec<Prefix4>, Error> {
    let mut result = Vec::new();
    while !buf.is_empty() {
        let length = buf[0];
        if length > 32 {
            return Err(Error::update(
                UpdateErrorSubcode::Unspecific,
                Vec::new(),
            ));
        }
        buf = &buf[1..];
        let n = (length as usize + 7) / 8;
        if buf.len() < n {
            return Err(Error::update(
                UpdateErrorSubcode::Unspecific,
                Vec::new(),
            ));
        }
        let mut octets = [0u8; 4];
        octets[..n].copy_from_slice(&buf[..n]);
        result.push(Prefix4::new(Ipv4Addr::from(octets), length));
        buf = &buf[n..];
    }
    Ok(result)
}

fn path_attrs_from_wire(
    mut buf: &[u8],
    four_byte: bool,
) -> Result<Vec<PathAttribute>, Error> {
    let mut result = Vec::new();
    while !buf.is_empty() {
        let (pa, n) = PathAttribute::from_wire(buf, four_byte)?;
        result.push(pa);
        buf = &buf[n..];
    }
    Ok(result)
}

/// Attribute flag bits, from the most significant bit down.
///
/// Ref: RFC 4271 §4.3
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum PathAttributeFlags {
    Optional = 0b1000_0000,
    Transitive = 0b0100_0000,
    Partial = 0b0010_0000,
    ExtendedLength = 0b0001_0000,
}

impl std::ops::BitOr<PathAttributeFlags> for PathAttributeFlags {
    type Output = u8;
    fn bitor(self, other: PathAttributeFlags) -> u8 {
        self as u8 | other as u8
    }
}

impl std::ops::BitAnd<PathAttributeFlags> for PathAttributeFlags {
    type Output = u8;
    fn bitand(self, other: PathAttributeFlags) -> u8 {
        self as u8 & other as u8
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum PathAttributeTypeCode {
    /// RFC 4271
    Origin = 1,
    AsPath = 2,
    NextHop = 3,
    MultiExitDisc = 4,
    LocalPref = 5,
    AtomicAggregate = 6,
    Aggregator = 7,

    /// RFC 1997
    Community = 8,

    /// RFC 6793
    As4Path = 17,
    As4Aggregator = 18,
}

/// Flags and type code of a path attribute. The type code is kept raw so
/// unrecognized attributes survive a round trip.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct PathAttributeType {
    pub flags: u8,
    pub type_code: u8,
}

impl PathAttributeType {
    pub fn is_optional(&self) -> bool {
        self.flags & PathAttributeFlags::Optional as u8 != 0
    }
    pub fn is_transitive(&self) -> bool {
        self.flags & PathAttributeFlags::Transitive as u8 != 0
    }
    pub fn is_partial(&self) -> bool {
        self.flags & PathAttributeFlags::Partial as u8 != 0
    }
    pub fn is_extended(&self) -> bool {
        self.flags & PathAttributeFlags::ExtendedLength as u8 != 0
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PathAttribute {
    pub typ: PathAttributeType,
    pub value: PathAttributeValue,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PathAttributeValue {
    Origin(PathOrigin),
    AsPath(AsPath),
    NextHop(Ipv4Addr),
    MultiExitDisc(u32),
    LocalPref(u32),
    AtomicAggregate,
    Aggregator(Aggregator),
    Community(u32),
    As4Path(Vec<AsPathSegment>),
    As4Aggregator(As4Aggregator),
    /// Raw value bytes of an attribute this implementation does not
    /// recognize, preserved for re-advertisement.
    Unknown(Vec<u8>),
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum PathOrigin {
    Igp = 0,
    Egp = 1,
    Incomplete = 2,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum AsPathSegmentType {
    AsSet = 1,
    AsSequence = 2,
}

/// One AS_PATH or AS4_PATH segment. Values are stored 4 bytes wide; the
/// encoding width comes from the owning attribute.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsPathSegment {
    pub typ: AsPathSegmentType,
    pub value: Vec<u32>,
}

impl AsPathSegment {
    /// Number of ASNs this segment contributes to path length comparisons:
    /// an AS_SET counts as one hop no matter how many members it has.
    pub fn hop_count(&self) -> usize {
        match self.typ {
            AsPathSegmentType::AsSet => 1,
            AsPathSegmentType::AsSequence => self.value.len(),
        }
    }
}

/// The AS_PATH attribute value. `four_byte` records the ASN width the
/// attribute was parsed with or will be written with.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsPath {
    pub four_byte: bool,
    pub segments: Vec<AsPathSegment>,
}

impl AsPath {
    /// Total hop count with AS_SET segments counting as one.
    pub fn hop_count(&self) -> usize {
        self.segments.iter().map(|s| s.hop_count()).sum()
    }

    /// The leftmost ASN of the path, i.e. the neighboring AS.
    pub fn first_asn(&self) -> Option<u32> {
        self.segments.first().and_then(|s| s.value.first()).copied()
    }

    pub fn contains(&self, asn: u32) -> bool {
        self.segments.iter().any(|s| s.value.contains(&asn))
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Aggregator {
    pub four_byte: bool,
    pub asn: u32,
    pub addr: Ipv4Addr,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct As4Aggregator {
    pub asn: u32,
    pub addr: Ipv4Addr,
}

const WELL_KNOWN: u8 = PathAttributeFlags::Transitive as u8;
const OPTIONAL_TRANSITIVE: u8 =
    PathAttributeFlags::Optional as u8 | PathAttributeFlags::Transitive as u8;
const OPTIONAL_NON_TRANSITIVE: u8 = PathAttributeFlags::Optional as u8;

impl PathAttribute {
    pub fn origin(origin: PathOrigin) -> PathAttribute {
        PathAttribute {
            typ: PathAttributeType {
                flags: WELL_KNOWN,
                type_code: PathAttributeTypeCode::Origin as u8,
            },
            value: PathAttributeValue::Origin(origin),
        }
    }

    pub fn as_path(path: AsPath) -> PathAttribute {
        PathAttribute {
            typ: PathAttributeType {
                flags: WELL_KNOWN,
                type_code: PathAttributeTypeCode::AsPath as u8,
            },
            value: PathAttributeValue::AsPath(path),
        }
    }

    pub fn next_hop(addr: Ipv4Addr) -> PathAttribute {
        PathAttribute {
            typ: PathAttributeType {
                flags: WELL_KNOWN,
                type_code: PathAttributeTypeCode::NextHop as u8,
            },
            value: PathAttributeValue::NextHop(addr),
        }
    }

    pub fn med(value: u32) -> PathAttribute {
        PathAttribute {
            typ: PathAttributeType {
                flags: OPTIONAL_NON_TRANSITIVE,
                type_code: PathAttributeTypeCode::MultiExitDisc as u8,
            },
            value: PathAttributeValue::MultiExitDisc(value),
        }
    }

    pub fn local_pref(value: u32) -> PathAttribute {
        PathAttribute {
            typ: PathAttributeType {
                flags: WELL_KNOWN,
                type_code: PathAttributeTypeCode::LocalPref as u8,
            },
            value: PathAttributeValue::LocalPref(value),
        }
    }

    pub fn atomic_aggregate() -> PathAttribute {
        PathAttribute {
            typ: PathAttributeType {
                flags: WELL_KNOWN,
                type_code: PathAttributeTypeCode::AtomicAggregate as u8,
            },
            value: PathAttributeValue::AtomicAggregate,
        }
    }

    pub fn aggregator(aggregator: Aggregator) -> PathAttribute {
        PathAttribute {
            typ: PathAttributeType {
                flags: OPTIONAL_TRANSITIVE,
                type_code: PathAttributeTypeCode::Aggregator as u8,
            },
            value: PathAttributeValue::Aggregator(aggregator),
        }
    }

    pub fn community(value: u32) -> PathAttribute {
        PathAttribute {
            typ: PathAttributeType {
                flags: OPTIONAL_TRANSITIVE,
                type_code: PathAttributeTypeCode::Community as u8,
            },
            value: PathAttributeValue::Community(value),
        }
    }

    pub fn as4_path(segments: Vec<AsPathSegment>) -> PathAttribute {
        PathAttribute {
            typ: PathAttributeType {
                flags: OPTIONAL_TRANSITIVE,
                type_code: PathAttributeTypeCode::As4Path as u8,
            },
            value: PathAttributeValue::As4Path(segments),
        }
    }

    pub fn as4_aggregator(aggregator: As4Aggregator) -> PathAttribute {
        PathAttribute {
            typ: PathAttributeType {
                flags: OPTIONAL_TRANSITIVE,
                type_code: PathAttributeTypeCode::As4Aggregator as u8,
            },
            value: PathAttributeValue::As4Aggregator(aggregator),
        }
    }

    /// Serialize the attribute: flags, type code, then a 1- or 2-byte
    /// length depending on the extended-length flag. The flag is promoted
    /// automatically when the value cannot fit a 1-byte length.
    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        let val = self.value_to_wire()?;
        let mut flags = self.typ.flags;
        if val.len() > u8::MAX as usize {
            flags |= PathAttributeFlags::ExtendedLength as u8;
        }
        if val.len() > u16::MAX as usize {
            return Err(Error::TooLarge("attribute value".into()));
        }

        let mut buf = vec![flags, self.typ.type_code];
        if flags & PathAttributeFlags::ExtendedLength as u8 != 0 {
            buf.extend_from_slice(&(val.len() as u16).to_be_bytes());
        } else {
            buf.push(val.len() as u8);
        }
        buf.extend_from_slice(&val);
        Ok(buf)
    }

    fn value_to_wire(&self) -> Result<Vec<u8>, Error> {
        match &self.value {
            PathAttributeValue::Origin(origin) => Ok(vec![*origin as u8]),
            PathAttributeValue::AsPath(path) => {
                let mut buf = Vec::new();
                for seg in &path.segments {
                    write_segment(&mut buf, seg, path.four_byte)?;
                }
                Ok(buf)
            }
            PathAttributeValue::NextHop(addr) => Ok(addr.octets().to_vec()),
            PathAttributeValue::MultiExitDisc(v) => {
                Ok(v.to_be_bytes().to_vec())
            }
            PathAttributeValue::LocalPref(v) => Ok(v.to_be_bytes().to_vec()),
            PathAttributeValue::AtomicAggregate => Ok(Vec::new()),
            PathAttributeValue::Aggregator(a) => {
                let mut buf = Vec::new();
                if a.four_byte {
                    buf.extend_from_slice(&a.asn.to_be_bytes());
                } else {
                    let asn = if a.asn > u16::MAX as u32 {
                        AS_TRANS
                    } else {
                        a.asn as u16
                    };
                    buf.extend_from_slice(&asn.to_be_bytes());
                }
                buf.extend_from_slice(&a.addr.octets());
                Ok(buf)
            }
            PathAttributeValue::Community(v) => Ok(v.to_be_bytes().to_vec()),
            PathAttributeValue::As4Path(segments) => {
                let mut buf = Vec::new();
                for seg in segments {
                    write_segment(&mut buf, seg, true)?;
                }
                Ok(buf)
            }
            PathAttributeValue::As4Aggregator(a) => {
                let mut buf = a.asn.to_be_bytes().to_vec();
                buf.extend_from_slice(&a.addr.octets());
                Ok(buf)
            }
            PathAttributeValue::Unknown(bytes) => Ok(bytes.clone()),
        }
    }

    /// Parse one attribute. `four_byte` selects the ASN width for AS_PATH
    /// and AGGREGATOR. Returns the attribute and the bytes consumed.
    pub fn from_wire(
        buf: &[u8],
        four_byte: bool,
    ) -> Result<(PathAttribute, usize), Error> {
        if buf.len() < 3 {
            return Err(Error::update(
                UpdateErrorSubcode::Unspecific,
                Vec::new(),
            ));
        }

        let typ = PathAttributeType {
            flags: buf[0],
            type_code: buf[1],
        };

        let (value_len, header_len) = if typ.is_extended() {
            if buf.len() < 4 {
                return Err(Error::update(
                    UpdateErrorSubcode::Unspecific,
                    Vec::new(),
                ));
            }
            (u16::from_be_bytes([buf[2], buf[3]]) as usize, 4)
        } else {
            (buf[2] as usize, 3)
        };

        // The first bytes of the attribute are echoed as notification data
        // on flag and length errors.
        let echo = buf[..buf.len().min(header_len + 1)].to_vec();

        if value_len > buf.len() - header_len {
            return Err(Error::update(
                UpdateErrorSubcode::AttributeLength,
                echo,
            ));
        }

        let value = &buf[header_len..header_len + value_len];
        let consumed = header_len + value_len;

        // The partial bit is legitimate only on optional transitive
        // attributes; for everything else the full pattern is fixed.
        let check_flags = |want: u8, partial_ok: bool| -> Result<(), Error> {
            let mut relevant = PathAttributeFlags::Optional as u8
                | PathAttributeFlags::Transitive as u8;
            if !partial_ok {
                relevant |= PathAttributeFlags::Partial as u8;
            }
            if typ.flags & relevant != want {
                Err(Error::update(
                    UpdateErrorSubcode::AttributeFlags,
                    echo.clone(),
                ))
            } else {
                Ok(())
            }
        };
        let check_len = |want: usize| -> Result<(), Error> {
            if value_len != want {
                Err(Error::update(
                    UpdateErrorSubcode::AttributeLength,
                    echo.clone(),
                ))
            } else {
                Ok(())
            }
        };

        let value = match PathAttributeTypeCode::try_from(typ.type_code) {
            Ok(PathAttributeTypeCode::Origin) => {
                check_flags(WELL_KNOWN, false)?;
                check_len(1)?;
                let origin =
                    PathOrigin::try_from(value[0]).map_err(|_| {
                        Error::update(
                            UpdateErrorSubcode::InvalidOrigin,
                            echo.clone(),
                        )
                    })?;
                PathAttributeValue::Origin(origin)
            }
            Ok(PathAttributeTypeCode::AsPath) => {
                check_flags(WELL_KNOWN, false)?;
                PathAttributeValue::AsPath(AsPath {
                    four_byte,
                    segments: segments_from_wire(value, four_byte)?,
                })
            }
            Ok(PathAttributeTypeCode::NextHop) => {
                check_flags(WELL_KNOWN, false)?;
                check_len(4)?;
                PathAttributeValue::NextHop(Ipv4Addr::new(
                    value[0], value[1], value[2], value[3],
                ))
            }
            Ok(PathAttributeTypeCode::MultiExitDisc) => {
                check_flags(OPTIONAL_NON_TRANSITIVE, false)?;
                check_len(4)?;
                PathAttributeValue::MultiExitDisc(u32::from_be_bytes([
                    value[0], value[1], value[2], value[3],
                ]))
            }
            Ok(PathAttributeTypeCode::LocalPref) => {
                check_flags(WELL_KNOWN, false)?;
                check_len(4)?;
                PathAttributeValue::LocalPref(u32::from_be_bytes([
                    value[0], value[1], value[2], value[3],
                ]))
            }
            Ok(PathAttributeTypeCode::AtomicAggregate) => {
                check_flags(WELL_KNOWN, false)?;
                check_len(0)?;
                PathAttributeValue::AtomicAggregate
            }
            Ok(PathAttributeTypeCode::Aggregator) => {
                check_flags(OPTIONAL_TRANSITIVE, true)?;
                if four_byte {
                    check_len(8)?;
                    PathAttributeValue::Aggregator(Aggregator {
                        four_byte: true,
                        asn: u32::from_be_bytes([
                            value[0], value[1], value[2], value[3],
                        ]),
                        addr: Ipv4Addr::new(
                            value[4], value[5], value[6], value[7],
                        ),
                    })
                } else {
                    check_len(6)?;
                    PathAttributeValue::Aggregator(Aggregator {
                        four_byte: false,
                        asn: u16::from_be_bytes([value[0], value[1]]) as u32,
                        addr: Ipv4Addr::new(
                            value[2], value[3], value[4], value[5],
                        ),
                    })
                }
            }
            Ok(PathAttributeTypeCode::Community) => {
                check_flags(OPTIONAL_TRANSITIVE, true)?;
                check_len(4)?;
                PathAttributeValue::Community(u32::from_be_bytes([
                    value[0], value[1], value[2], value[3],
                ]))
            }
            Ok(PathAttributeTypeCode::As4Path) => {
                check_flags(OPTIONAL_TRANSITIVE, true)?;
                PathAttributeValue::As4Path(segments_from_wire(value, true)?)
            }
            Ok(PathAttributeTypeCode::As4Aggregator) => {
                check_flags(OPTIONAL_TRANSITIVE, true)?;
                check_len(8)?;
                PathAttributeValue::As4Aggregator(As4Aggregator {
                    asn: u32::from_be_bytes([
                        value[0], value[1], value[2], value[3],
                    ]),
                    addr: Ipv4Addr::new(
                        value[4], value[5], value[6], value[7],
                    ),
                })
            }
            Err(_) => {
                // Unrecognized attribute. A well-known (non-optional
                // transitive) attribute we do not recognize is fatal; an
                // optional one is preserved verbatim.
                if !typ.is_optional() && typ.is_transitive() {
                    return Err(Error::update(
                        UpdateErrorSubcode::UnrecognizedWellKnownAttribute,
                        buf[..consumed].to_vec(),
                    ));
                }
                PathAttributeValue::Unknown(value.to_vec())
            }
        };

        Ok((PathAttribute { typ, value }, consumed))
    }
}

fn write_segment(
    buf: &mut Vec<u8>,
    seg: &AsPathSegment,
    four_byte: bool,
) -> Result<(), Error> {
    if seg.value.len() > 255 {
        return Err(Error::TooLarge("as path segment".into()));
    }
    buf.push(seg.typ as u8);
    buf.push(seg.value.len() as u8);
    for asn in &seg.value {
        if four_byte {
            buf.extend_from_slice(&asn.to_be_bytes());
        } else {
            let asn = if *asn > u16::MAX as u32 {
                AS_TRANS
            } else {
                *asn as u16
            };
            buf.extend_from_slice(&asn.to_be_bytes());
        }
    }
    Ok(())
}

fn segments_from_wire(
    mut buf: &[u8],
    four_byte: bool,
) -> Result<Vec<AsPathSegment>, Error> {
    let width = if four_byte { 4 } else { 2 };
    let mut segments = Vec::new();

    while !buf.is_empty() {
        if buf.len() < 2 {
            return Err(Error::update(
                UpdateErrorSubcode::MalformedAsPath,
                Vec::new(),
            ));
        }
        let typ = AsPathSegmentType::try_from(buf[0]).map_err(|_| {
            Error::update(UpdateErrorSubcode::MalformedAsPath, Vec::new())
        })?;
        let count = buf[1] as usize;
        buf = &buf[2..];

        if buf.len() < count * width {
            return Err(Error::update(
                UpdateErrorSubcode::MalformedAsPath,
                Vec::new(),
            ));
        }

        let mut value = Vec::with_capacity(count);
        for _ in 0..count {
            let asn = if four_byte {
                u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
            } else {
                u16::from_be_bytes([buf[0], buf[1]]) as u32
            };
            value.push(asn);
            buf = &buf[width..];
        }

        segments.push(AsPathSegment { typ, value });
    }

    Ok(segments)
}

/// A NOTIFICATION message closes the session and reports why.
///
/// Ref: RFC 4271 §4.5
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NotificationMessage {
    pub error_code: u8,
    pub error_subcode: u8,
    pub data: Vec<u8>,
}

impl NotificationMessage {
    pub fn new(
        code: ErrorCode,
        subcode: ErrorSubcode,
        data: Vec<u8>,
    ) -> NotificationMessage {
        NotificationMessage {
            error_code: code as u8,
            error_subcode: subcode.as_u8(),
            data,
        }
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = vec![self.error_code, self.error_subcode];
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn from_wire(buf: &[u8]) -> Result<NotificationMessage, Error> {
        if buf.len() < 2 {
            return Err(Error::header(
                HeaderErrorSubcode::BadMessageLength,
                vec![buf.len() as u8],
            ));
        }
        Ok(NotificationMessage {
            error_code: buf[0],
            error_subcode: buf[1],
            data: buf[2..].to_vec(),
        })
    }
}

impl Display for NotificationMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match ErrorCode::try_from(self.error_code) {
            Ok(code) => {
                write!(f, "{:?}/{}", code, self.error_subcode)
            }
            Err(_) => {
                write!(f, "code {}/{}", self.error_code, self.error_subcode)
            }
        }
    }
}

/// Notification error codes.
///
/// Ref: RFC 4271 §4.5
#[derive(Debug, Eq, PartialEq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum ErrorCode {
    Header = 1,
    Open = 2,
    Update = 3,
    HoldTimerExpired = 4,
    Fsm = 5,
    Cease = 6,
}

/// A notification error subcode, typed by the error code family it belongs
/// to.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ErrorSubcode {
    Header(HeaderErrorSubcode),
    Open(OpenErrorSubcode),
    Update(UpdateErrorSubcode),
    HoldTimer,
    Fsm(FsmErrorSubcode),
    Cease(CeaseErrorSubcode),
}

impl ErrorSubcode {
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Header(s) => *s as u8,
            Self::Open(s) => *s as u8,
            Self::Update(s) => *s as u8,
            Self::HoldTimer => 0,
            Self::Fsm(s) => *s as u8,
            Self::Cease(s) => *s as u8,
        }
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum HeaderErrorSubcode {
    Unspecific = 0,
    ConnectionNotSynchronized = 1,
    BadMessageLength = 2,
    BadMessageType = 3,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum OpenErrorSubcode {
    Unspecific = 0,
    UnsupportedVersionNumber = 1,
    BadPeerAs = 2,
    BadBgpIdentifier = 3,
    UnsupportedOptionalParameter = 4,
    /// Deprecated in RFC 4271.
    AuthenticationFailure = 5,
    UnacceptableHoldTime = 6,
    /// RFC 5492
    UnsupportedCapability = 7,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum UpdateErrorSubcode {
    Unspecific = 0,
    MalformedAttributeList = 1,
    UnrecognizedWellKnownAttribute = 2,
    MissingWellKnownAttribute = 3,
    AttributeFlags = 4,
    AttributeLength = 5,
    InvalidOrigin = 6,
    /// Deprecated in RFC 4271.
    AsRoutingLoop = 7,
    InvalidNexthop = 8,
    OptionalAttribute = 9,
    InvalidNetworkField = 10,
    MalformedAsPath = 11,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum FsmErrorSubcode {
    Unspecific = 0,
    UnexpectedMessageInOpenSent = 1,
    UnexpectedMessageInOpenConfirm = 2,
    UnexpectedMessageInEstablished = 3,
}

/// Ref: RFC 4486
#[derive(Debug, Eq, PartialEq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum CeaseErrorSubcode {
    Unspecific = 0,
    MaximumPrefixesReached = 1,
    AdministrativeShutdown = 2,
    PeerDeconfigured = 3,
    AdministrativeReset = 4,
    ConnectionRejected = 5,
    OtherConfigurationChange = 6,
    ConnectionCollisionResolution = 7,
    OutOfResources = 8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::init_logger;
    use pretty_assertions::assert_eq;
    use pretty_hex::*;

    fn update_with_mandatory() -> UpdateMessage {
        UpdateMessage {
            withdrawn: vec![],
            path_attributes: vec![
                PathAttribute::origin(PathOrigin::Igp),
                PathAttribute::as_path(AsPath {
                    four_byte: true,
                    segments: vec![AsPathSegment {
                        typ: AsPathSegmentType::AsSequence,
                        value: vec![70000, 65000],
                    }],
                }),
                PathAttribute::next_hop("10.0.0.1".parse().unwrap()),
            ],
            nlri: vec!["10.20.0.0/16".parse().unwrap()],
        }
    }

    #[test]
    fn header_round_trip() {
        let h0 = Header {
            length: 0x1701,
            typ: MessageType::Notification,
        };

        let buf = h0.to_wire();
        println!("buf: {}", buf.hex_dump());

        assert_eq!(
            buf,
            vec![
                0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
                0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // marker
                0x17, 0x01, // length
                3,    // type
            ]
        );

        let h1 = Header::from_wire(&buf).expect("header from wire");
        assert_eq!(h0, h1);
    }

    #[test]
    fn header_rejects_garbage() {
        let mut buf = Header {
            length: 19,
            typ: MessageType::KeepAlive,
        }
        .to_wire();
        buf[0] = 0;
        match Header::from_wire(&buf) {
            Err(Error::Protocol { code, subcode, .. }) => {
                assert_eq!(code, ErrorCode::Header);
                assert_eq!(
                    subcode,
                    ErrorSubcode::Header(
                        HeaderErrorSubcode::ConnectionNotSynchronized
                    )
                );
            }
            other => panic!("expected header error, got {:?}", other),
        }

        let mut buf = Header {
            length: 19,
            typ: MessageType::KeepAlive,
        }
        .to_wire();
        buf[17] = 5; // length 19 -> 5
        match Header::from_wire(&buf) {
            Err(Error::Protocol { subcode, data, .. }) => {
                assert_eq!(
                    subcode,
                    ErrorSubcode::Header(HeaderErrorSubcode::BadMessageLength)
                );
                assert_eq!(data, vec![0x00, 0x05]);
            }
            other => panic!("expected length error, got {:?}", other),
        }
    }

    #[test]
    fn open_round_trip() {
        let om0 = OpenMessage::new4(395849, 0x1234, 0xaabbccdd);
        assert_eq!(om0.asn, AS_TRANS);

        let buf = om0.to_wire().expect("open message to wire");
        println!("buf: {}", buf.hex_dump());

        let om1 = OpenMessage::from_wire(&buf).expect("open message from wire");
        assert_eq!(om0, om1);
        assert_eq!(om1.four_octet_asn(), Some(395849));

        // A small ASN goes into the header field as well as the capability.
        let om = OpenMessage::new4(65000, 30, 1);
        assert_eq!(om.asn, 65000);
    }

    #[test]
    fn open_preserves_unknown_capability() {
        let om0 = OpenMessage {
            version: BGP4,
            asn: 65000,
            hold_time: 90,
            id: 7,
            parameters: vec![
                Capability::FourOctetAs { asn: 65000 }.into(),
                Capability::Unknown {
                    code: 73,
                    data: vec![1, 2, 3],
                }
                .into(),
            ],
        };
        let buf = om0.to_wire().expect("to wire");
        let om1 = OpenMessage::from_wire(&buf).expect("from wire");
        assert_eq!(om0, om1);
    }

    #[test]
    fn keepalive_round_trip() {
        let buf = Message::KeepAlive.to_wire().expect("to wire");
        assert_eq!(buf.len(), HEADER_SIZE);
        let (msg, n) = Message::from_wire(&buf, true).expect("from wire");
        assert_eq!(n, HEADER_SIZE);
        assert_eq!(msg, Message::KeepAlive);
    }

    #[test]
    fn notification_round_trip() {
        let n0 = NotificationMessage::new(
            ErrorCode::Open,
            ErrorSubcode::Open(OpenErrorSubcode::BadPeerAs),
            vec![0xfd, 0xe9],
        );
        let buf = Message::Notification(n0.clone())
            .to_wire()
            .expect("to wire");
        let (msg, _) = Message::from_wire(&buf, false).expect("from wire");
        assert_eq!(msg, Message::Notification(n0));
    }

    #[test]
    fn update_round_trip_four_byte() {
        let um0 = UpdateMessage {
            withdrawn: vec!["172.16.10.0/24".parse().unwrap()],
            path_attributes: vec![
                PathAttribute::origin(PathOrigin::Igp),
                PathAttribute::as_path(AsPath {
                    four_byte: true,
                    segments: vec![AsPathSegment {
                        typ: AsPathSegmentType::AsSequence,
                        value: vec![395849, 123456, 987654],
                    }],
                }),
                PathAttribute::next_hop("10.0.0.1".parse().unwrap()),
                PathAttribute::med(100),
                PathAttribute::local_pref(200),
                PathAttribute::community(0xfde80001),
            ],
            nlri: vec![
                "10.20.0.0/16".parse().unwrap(),
                "10.30.0.0/23".parse().unwrap(),
                "0.0.0.0/0".parse().unwrap(),
            ],
        };

        let buf = um0.to_wire().expect("update message to wire");
        println!("buf: {}", buf.hex_dump());

        let um1 =
            UpdateMessage::from_wire(&buf, true).expect("update from wire");
        assert_eq!(um0, um1);
    }

    #[test]
    fn update_round_trip_two_byte() {
        let um0 = UpdateMessage {
            withdrawn: vec![],
            path_attributes: vec![
                PathAttribute::origin(PathOrigin::Egp),
                PathAttribute::as_path(AsPath {
                    four_byte: false,
                    segments: vec![
                        AsPathSegment {
                            typ: AsPathSegmentType::AsSet,
                            value: vec![64512, 64513],
                        },
                        AsPathSegment {
                            typ: AsPathSegmentType::AsSequence,
                            value: vec![65000],
                        },
                    ],
                }),
                PathAttribute::next_hop("192.0.2.1".parse().unwrap()),
                PathAttribute::aggregator(Aggregator {
                    four_byte: false,
                    asn: 65010,
                    addr: "192.0.2.7".parse().unwrap(),
                }),
            ],
            nlri: vec!["198.51.100.0/25".parse().unwrap()],
        };

        let buf = um0.to_wire().expect("to wire");
        let um1 =
            UpdateMessage::from_wire(&buf, false).expect("from wire");
        assert_eq!(um0, um1);
    }

    #[test]
    fn two_byte_path_never_carries_large_asn() {
        // An ASN beyond the 2-byte range in a 2-byte attribute encodes
        // AS_TRANS on the wire.
        let um = UpdateMessage {
            path_attributes: vec![
                PathAttribute::origin(PathOrigin::Igp),
                PathAttribute::as_path(AsPath {
                    four_byte: false,
                    segments: vec![AsPathSegment {
                        typ: AsPathSegmentType::AsSequence,
                        value: vec![70000, 65000],
                    }],
                }),
                PathAttribute::next_hop("10.0.0.1".parse().unwrap()),
            ],
            ..Default::default()
        };
        let buf = um.to_wire().expect("to wire");
        let um1 = UpdateMessage::from_wire(&buf, false).expect("from wire");
        assert_eq!(
            um1.as_path().unwrap().segments[0].value,
            vec![AS_TRANS as u32, 65000]
        );
    }

    #[test]
    fn update_rejects_duplicate_attribute() {
        let mut um = update_with_mandatory();
        um.path_attributes.push(PathAttribute::origin(PathOrigin::Egp));
        match um.validate_attribs() {
            Err(Error::Protocol { subcode, .. }) => assert_eq!(
                subcode,
                ErrorSubcode::Update(
                    UpdateErrorSubcode::MalformedAttributeList
                )
            ),
            other => panic!("expected attribute list error, got {other:?}"),
        }
    }

    #[test]
    fn update_requires_mandatory_attribs_with_nlri() {
        let mut um = update_with_mandatory();
        um.path_attributes.remove(2); // next hop
        match um.validate_attribs() {
            Err(Error::Protocol { subcode, .. }) => assert_eq!(
                subcode,
                ErrorSubcode::Update(
                    UpdateErrorSubcode::MissingWellKnownAttribute
                )
            ),
            other => panic!("expected missing well-known, got {other:?}"),
        }

        // A withdraw-only update with no attributes at all is fine.
        let um = UpdateMessage {
            withdrawn: vec!["10.0.0.0/8".parse().unwrap()],
            ..Default::default()
        };
        um.validate_attribs().expect("withdraw-only update");
        let buf = um.to_wire().expect("to wire");
        let um1 = UpdateMessage::from_wire(&buf, true).expect("from wire");
        assert_eq!(um, um1);
    }

    #[test]
    fn origin_value_checked() {
        let mut um = update_with_mandatory();
        um.path_attributes[0] = PathAttribute::origin(PathOrigin::Igp);
        let mut buf = um.to_wire().expect("to wire");
        // Corrupt the origin value: attribute section starts after the two
        // length fields and the origin value is the 4th attribute byte.
        let origin_value = 4 + 3;
        assert_eq!(buf[origin_value], 0);
        buf[origin_value] = 9;
        match UpdateMessage::from_wire(&buf, true) {
            Err(Error::Protocol { subcode, .. }) => assert_eq!(
                subcode,
                ErrorSubcode::Update(UpdateErrorSubcode::InvalidOrigin)
            ),
            other => panic!("expected origin error, got {other:?}"),
        }
    }

    #[test]
    fn attribute_flag_errors_echo_header() {
        let um = update_with_mandatory();
        let mut buf = um.to_wire().expect("to wire");
        // Flip the origin attribute's flags to optional.
        let origin_flags = 4;
        buf[origin_flags] |= PathAttributeFlags::Optional as u8;
        match UpdateMessage::from_wire(&buf, true) {
            Err(Error::Protocol { subcode, data, .. }) => {
                assert_eq!(
                    subcode,
                    ErrorSubcode::Update(UpdateErrorSubcode::AttributeFlags)
                );
                assert_eq!(data[1], PathAttributeTypeCode::Origin as u8);
            }
            other => panic!("expected flag error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_optional_attribute_survives() {
        let mut um = update_with_mandatory();
        um.path_attributes.push(PathAttribute {
            typ: PathAttributeType {
                flags: OPTIONAL_TRANSITIVE,
                type_code: 201,
            },
            value: PathAttributeValue::Unknown(vec![0xde, 0xad, 0xbe, 0xef]),
        });
        let buf = um.to_wire().expect("to wire");
        let um1 = UpdateMessage::from_wire(&buf, true).expect("from wire");
        assert_eq!(um, um1);
    }

    #[test]
    fn unknown_well_known_attribute_is_fatal() {
        let mut um = update_with_mandatory();
        um.path_attributes.push(PathAttribute {
            typ: PathAttributeType {
                flags: WELL_KNOWN,
                type_code: 202,
            },
            value: PathAttributeValue::Unknown(vec![1]),
        });
        let buf = um.to_wire().expect("to wire");
        match UpdateMessage::from_wire(&buf, true) {
            Err(Error::Protocol { subcode, .. }) => assert_eq!(
                subcode,
                ErrorSubcode::Update(
                    UpdateErrorSubcode::UnrecognizedWellKnownAttribute
                )
            ),
            other => panic!("expected well-known error, got {other:?}"),
        }
    }

    #[test]
    fn extended_length_round_trip() {
        let mut um = update_with_mandatory();
        // 300 bytes of unknown optional data forces the 2-byte length form.
        um.path_attributes.push(PathAttribute {
            typ: PathAttributeType {
                flags: OPTIONAL_TRANSITIVE,
                type_code: 210,
            },
            value: PathAttributeValue::Unknown(vec![7u8; 300]),
        });
        let buf = um.to_wire().expect("to wire");
        let um1 = UpdateMessage::from_wire(&buf, true).expect("from wire");
        let attr = um1
            .path_attributes
            .iter()
            .find(|a| a.typ.type_code == 210)
            .unwrap();
        assert!(attr.typ.is_extended());
        assert_eq!(
            attr.value,
            PathAttributeValue::Unknown(vec![7u8; 300])
        );
    }

    #[test]
    fn nlri_length_checked() {
        let um = UpdateMessage {
            withdrawn: vec![],
            path_attributes: vec![],
            nlri: vec![],
        };
        let mut buf = um.to_wire().expect("to wire");
        buf.extend_from_slice(&[33, 1, 2, 3, 4, 5]); // /33 is nonsense
        match UpdateMessage::from_wire(&buf, true) {
            Err(Error::Protocol { subcode, .. }) => assert_eq!(
                subcode,
                ErrorSubcode::Update(UpdateErrorSubcode::Unspecific)
            ),
            other => panic!("expected nlri error, got {other:?}"),
        }
    }

    #[test]
    fn downgrade_as_path() {
        // Scenario: AS_PATH [70000, 65000] re-advertised to a 2-byte peer.
        let mut um = update_with_mandatory();
        um.downgrade_as_path();

        let path = um.as_path().unwrap();
        assert!(!path.four_byte);
        assert_eq!(path.segments[0].value, vec![AS_TRANS as u32, 65000]);

        match &um.get_attrib(PathAttributeTypeCode::As4Path).unwrap().value {
            PathAttributeValue::As4Path(segs) => {
                assert_eq!(segs[0].value, vec![70000, 65000]);
            }
            other => panic!("expected as4 path, got {other:?}"),
        }
    }

    #[test]
    fn restore_as_path() {
        let log = init_logger();
        let mut um = update_with_mandatory();
        um.downgrade_as_path();

        // What a 4-byte speaker does upon receiving the 2-byte rendition.
        um.restore_as_path(&log);
        let path = um.as_path().unwrap();
        assert!(path.four_byte);
        assert_eq!(path.segments[0].value, vec![70000, 65000]);
        assert!(!um.has_attrib(PathAttributeTypeCode::As4Path));
    }

    #[test]
    fn restore_without_as4_path() {
        let log = init_logger();
        let mut um = update_with_mandatory();
        um.downgrade_as_path();
        um.drop_attrib(PathAttributeTypeCode::As4Path);

        um.restore_as_path(&log);
        let path = um.as_path().unwrap();
        assert!(path.four_byte);
        // Nothing to restore from, AS_TRANS stays.
        assert_eq!(path.segments[0].value, vec![AS_TRANS as u32, 65000]);
    }

    #[test]
    fn aggregator_duality() {
        let mut um = update_with_mandatory();
        um.update_attrib(PathAttribute::aggregator(Aggregator {
            four_byte: true,
            asn: 200000,
            addr: "10.0.0.9".parse().unwrap(),
        }));

        um.downgrade_aggregator();
        match &um.get_attrib(PathAttributeTypeCode::Aggregator).unwrap().value
        {
            PathAttributeValue::Aggregator(a) => {
                assert!(!a.four_byte);
                assert_eq!(a.asn, AS_TRANS as u32);
            }
            other => panic!("expected aggregator, got {other:?}"),
        }
        assert!(um.has_attrib(PathAttributeTypeCode::As4Aggregator));

        um.restore_aggregator();
        match &um.get_attrib(PathAttributeTypeCode::Aggregator).unwrap().value
        {
            PathAttributeValue::Aggregator(a) => {
                assert!(a.four_byte);
                assert_eq!(a.asn, 200000);
                assert_eq!(a.addr, "10.0.0.9".parse::<Ipv4Addr>().unwrap());
            }
            other => panic!("expected aggregator, got {other:?}"),
        }
        assert!(!um.has_attrib(PathAttributeTypeCode::As4Aggregator));
    }

    #[test]
    fn prepend_grows_leading_sequence() {
        let mut um = update_with_mandatory();
        um.prepend(65100);
        assert_eq!(
            um.as_path().unwrap().segments[0].value,
            vec![65100, 70000, 65000]
        );

        // Prepending onto a set starts a fresh sequence.
        let mut um = update_with_mandatory();
        um.as_path_mut().unwrap().segments[0].typ = AsPathSegmentType::AsSet;
        um.prepend(65100);
        let path = um.as_path().unwrap();
        assert_eq!(path.segments.len(), 2);
        assert_eq!(path.segments[0].value, vec![65100]);

        // An empty path gets one too.
        let mut um = UpdateMessage::default();
        um.prepend(65100);
        assert_eq!(um.as_path().unwrap().segments[0].value, vec![65100]);
    }

    #[test]
    fn as_path_hop_count() {
        let path = AsPath {
            four_byte: true,
            segments: vec![
                AsPathSegment {
                    typ: AsPathSegmentType::AsSequence,
                    value: vec![1, 2, 3],
                },
                AsPathSegment {
                    typ: AsPathSegmentType::AsSet,
                    value: vec![4, 5, 6, 7],
                },
            ],
        };
        assert_eq!(path.hop_count(), 4);
        assert_eq!(path.first_asn(), Some(1));
        assert!(path.contains(6));
        assert!(!path.contains(8));
    }
}
