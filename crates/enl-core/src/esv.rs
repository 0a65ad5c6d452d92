//! Service code definitions
//!
//! Every request service code is paired with a success reply and a
//! failure (SNA) reply:
//! - SetI: fire-and-forget set, failure-only reply
//! - SetC: confirmed set
//! - Get: property read
//! - INF_REQ: observation request, answered by a group announcement
//! - SetGet: set then read in one frame
//! - INF / INFC: announcements, INFC asks for a confirmation echo

/// Service code carried by every frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Esv {
    SetISna = 0x50,
    SetCSna = 0x51,
    GetSna = 0x52,
    InfSna = 0x53,
    SetGetSna = 0x5E,

    SetI = 0x60,
    SetC = 0x61,
    Get = 0x62,
    InfReq = 0x63,
    SetGet = 0x6E,

    SetRes = 0x71,
    GetRes = 0x72,
    Inf = 0x73,
    InfC = 0x74,
    InfCRes = 0x7A,
    SetGetRes = 0x7E,
}

impl Esv {
    /// Parse from wire byte
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x50 => Some(Esv::SetISna),
            0x51 => Some(Esv::SetCSna),
            0x52 => Some(Esv::GetSna),
            0x53 => Some(Esv::InfSna),
            0x5E => Some(Esv::SetGetSna),
            0x60 => Some(Esv::SetI),
            0x61 => Some(Esv::SetC),
            0x62 => Some(Esv::Get),
            0x63 => Some(Esv::InfReq),
            0x6E => Some(Esv::SetGet),
            0x71 => Some(Esv::SetRes),
            0x72 => Some(Esv::GetRes),
            0x73 => Some(Esv::Inf),
            0x74 => Some(Esv::InfC),
            0x7A => Some(Esv::InfCRes),
            0x7E => Some(Esv::SetGetRes),
            _ => None,
        }
    }

    /// Convert to wire byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Reply code sent when every property succeeded
    pub fn success_reply(self) -> Option<Esv> {
        match self {
            Esv::SetC => Some(Esv::SetRes),
            Esv::Get => Some(Esv::GetRes),
            Esv::InfReq => Some(Esv::Inf),
            Esv::SetGet => Some(Esv::SetGetRes),
            Esv::InfC => Some(Esv::InfCRes),
            _ => None,
        }
    }

    /// Reply code sent when at least one property failed
    pub fn failure_reply(self) -> Option<Esv> {
        match self {
            Esv::SetI => Some(Esv::SetISna),
            Esv::SetC => Some(Esv::SetCSna),
            Esv::Get => Some(Esv::GetSna),
            Esv::InfReq => Some(Esv::InfSna),
            Esv::SetGet => Some(Esv::SetGetSna),
            _ => None,
        }
    }

    /// Request codes handled by the set/get processor
    pub fn is_set_get_request(self) -> bool {
        matches!(
            self,
            Esv::SetI | Esv::SetC | Esv::Get | Esv::InfReq | Esv::SetGet
        )
    }

    /// Inbound announcement codes
    pub fn is_announcement(self) -> bool {
        matches!(self, Esv::Inf | Esv::InfC)
    }

    /// Failure replies
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Esv::SetISna | Esv::SetCSna | Esv::GetSna | Esv::InfSna | Esv::SetGetSna
        )
    }

    /// Does the frame carry a second property list?
    pub fn has_second_list(self) -> bool {
        matches!(self, Esv::SetGet | Esv::SetGetRes | Esv::SetGetSna)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Esv; 16] = [
        Esv::SetISna,
        Esv::SetCSna,
        Esv::GetSna,
        Esv::InfSna,
        Esv::SetGetSna,
        Esv::SetI,
        Esv::SetC,
        Esv::Get,
        Esv::InfReq,
        Esv::SetGet,
        Esv::SetRes,
        Esv::GetRes,
        Esv::Inf,
        Esv::InfC,
        Esv::InfCRes,
        Esv::SetGetRes,
    ];

    #[test]
    fn test_esv_byte_roundtrip() {
        for esv in ALL {
            assert_eq!(Esv::from_byte(esv.to_byte()), Some(esv));
        }
        assert_eq!(Esv::from_byte(0x00), None);
    }

    #[test]
    fn test_reply_pairing() {
        assert_eq!(Esv::SetI.success_reply(), None);
        assert_eq!(Esv::SetI.failure_reply(), Some(Esv::SetISna));
        assert_eq!(Esv::SetGet.success_reply(), Some(Esv::SetGetRes));
        assert_eq!(Esv::SetGet.failure_reply(), Some(Esv::SetGetSna));
        assert_eq!(Esv::InfReq.success_reply(), Some(Esv::Inf));
        assert_eq!(Esv::InfC.success_reply(), Some(Esv::InfCRes));
        assert_eq!(Esv::InfC.failure_reply(), None);
    }

    #[test]
    fn test_failure_codes_are_failures() {
        for esv in ALL {
            if let Some(sna) = esv.failure_reply() {
                assert!(sna.is_failure());
                assert!(esv.is_set_get_request());
            }
        }
    }
}
