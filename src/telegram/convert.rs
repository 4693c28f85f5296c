//! Conversion of raw Telegram messages into normalized inbound events.

use std::path::Path;

use async_trait::async_trait;
use grammers_client::types::Media;
use grammers_client::update::Message;
use grammers_client::Client;
use grammers_tl_types as tl;
use tokio::io::AsyncWriteExt;

use crate::event::{InboundEvent, MediaError, MediaInfo, MediaKind, MediaSource, SenderInfo};

/// Builds an [`InboundEvent`] from a new-message update.
///
/// Never fails: every absent field of the raw message projects to an
/// absent field of the event.
#[must_use]
pub fn event_from_message(client: &Client, msg: &Message) -> InboundEvent {
    let (chat_id, chat_title) = match msg.peer() {
        Ok(peer) => (
            peer.id().bot_api_dialog_id(),
            peer.name().map(ToOwned::to_owned),
        ),
        // The peer can be unknown for updates referencing uncached chats;
        // the bare dialog id is still available.
        Err(_) => (msg.peer_id().bot_api_dialog_id(), None),
    };

    let sender = msg.sender().map(|peer| SenderInfo {
        id: Some(peer.id().bare_id()),
        username: peer.username().map(ToOwned::to_owned),
        display_name: peer.name().map(ToOwned::to_owned),
    });

    let (forwarded_from_user, forwarded_from_channel) = msg
        .forward_header()
        .map_or((None, None), |header| forward_identities(&header));

    let media = msg.media().map(|media| media_info(client, media));

    let raw_text = msg.text();
    let content = if raw_text.is_empty() {
        None
    } else {
        Some(raw_text.to_owned())
    };
    // grammers exposes one text field; for media messages it is the caption.
    let (text, caption) = if media.is_some() {
        (None, content)
    } else {
        (content, None)
    };

    InboundEvent {
        chat_id,
        chat_title,
        message_id: msg.id(),
        outgoing: msg.outgoing(),
        sender,
        forwarded_from_user,
        forwarded_from_channel,
        text,
        caption,
        media,
        sent_at: Some(msg.date()),
    }
}

/// Maps a forward header onto (user origin, channel origin).
fn forward_identities(
    header: &tl::enums::MessageFwdHeader,
) -> (Option<SenderInfo>, Option<SenderInfo>) {
    let tl::enums::MessageFwdHeader::Header(header) = header;

    match &header.from_id {
        Some(tl::enums::Peer::User(user)) => (
            Some(SenderInfo {
                id: Some(user.user_id),
                username: None,
                display_name: header.from_name.clone(),
            }),
            None,
        ),
        Some(tl::enums::Peer::Channel(channel)) => (
            None,
            Some(SenderInfo {
                id: Some(channel.channel_id),
                username: None,
                display_name: header
                    .post_author
                    .clone()
                    .or_else(|| header.from_name.clone()),
            }),
        ),
        Some(tl::enums::Peer::Chat(chat)) => (
            None,
            Some(SenderInfo {
                id: Some(chat.chat_id),
                username: None,
                display_name: header.from_name.clone(),
            }),
        ),
        // Hidden forward origin: only a display name survives.
        None => (
            header.from_name.as_ref().map(|name| SenderInfo {
                id: None,
                username: None,
                display_name: Some(name.clone()),
            }),
            None,
        ),
    }
}

/// Builds the media descriptor, attaching a download source for kinds
/// that carry file content.
fn media_info(client: &Client, media: Media) -> MediaInfo {
    let (kind, size_bytes, mime_type) = match &media {
        Media::Photo(_) => (MediaKind::Photo, None, Some("image/jpeg".to_owned())),
        Media::Document(document) => (
            MediaKind::Document,
            u64::try_from(document.size()).ok(),
            document.mime_type().map(ToOwned::to_owned),
        ),
        Media::Sticker(_) => (MediaKind::Sticker, None, Some("image/webp".to_owned())),
        Media::Contact(_) => (MediaKind::Contact, None, None),
        Media::Poll(_) => (MediaKind::Poll, None, None),
        Media::Geo(_) => (MediaKind::Geo, None, None),
        Media::Dice(_) => (MediaKind::Dice, None, None),
        Media::Venue(_) => (MediaKind::Venue, None, None),
        Media::WebPage(_) => (MediaKind::WebPage, None, None),
        _ => (MediaKind::Other, None, None),
    };

    let source = kind.is_downloadable().then(|| {
        Box::new(RemoteMedia {
            client: client.clone(),
            media,
        }) as Box<dyn MediaSource>
    });

    MediaInfo {
        kind,
        size_bytes,
        mime_type,
        source,
    }
}

/// Remote media reference backed by the grammers download API.
struct RemoteMedia {
    client: Client,
    media: Media,
}

#[async_trait]
impl MediaSource for RemoteMedia {
    async fn download_to(&self, dest: &Path) -> Result<u64, MediaError> {
        let mut download = self.client.iter_download(&self.media);

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = download
            .next()
            .await
            .map_err(|e| MediaError::Transfer(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}
