use serde::{ Serialize, Deserialize };

/// A message event as delivered by the messaging bridge.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(default)]
    pub id: Option<String>,
    pub from: String,
    #[serde(default)]
    pub has_media: bool,
    #[serde(default)]
    pub is_status: bool,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaPayload>,
}

impl InboundEvent {
    pub fn text(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            body: Some(body.into()),
            ..Default::default()
        }
    }

    pub fn with_media(from: impl Into<String>, media: MediaPayload) -> Self {
        Self {
            from: from.into(),
            has_media: true,
            media: Some(media),
            ..Default::default()
        }
    }
}

/// Downloaded media: MIME type plus base64 encoded bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    pub mime_type: String,
    pub data: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCodec {
    Ogg,
}

impl AudioCodec {
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let subtype = mime_type.split('/').nth(1)?.to_ascii_lowercase();
        if subtype.contains("ogg") {
            Some(AudioCodec::Ogg)
        } else {
            None
        }
    }

    /// File extension and ffmpeg input format name.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioCodec::Ogg => "ogg",
        }
    }
}

/// What the router does with an event, decided once at ingress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundMessage {
    Text { body: String },
    Audio { codec: AudioCodec, payload: MediaPayload },
    OtherMedia { mime_type: String },
    Status,
}

impl InboundMessage {
    /// `media` is only looked at when the event says it carries media.
    pub fn classify(event: &InboundEvent, media: Option<MediaPayload>) -> Self {
        if event.is_status {
            return InboundMessage::Status;
        }
        if !event.has_media {
            return InboundMessage::Text {
                body: event.body.clone().unwrap_or_default(),
            };
        }
        match media {
            Some(payload) => match AudioCodec::from_mime(&payload.mime_type) {
                Some(codec) => InboundMessage::Audio { codec, payload },
                None => InboundMessage::OtherMedia { mime_type: payload.mime_type },
            },
            None => InboundMessage::OtherMedia { mime_type: String::new() },
        }
    }
}
