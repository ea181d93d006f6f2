//! Minimal HLS playlist parser.
//!
//! Understands the subset of tags the software engine needs to follow a
//! live stream: the `#EXTM3U` header, `#EXT-X-TARGETDURATION`,
//! `#EXT-X-MEDIA-SEQUENCE`, `#EXTINF`, `#EXT-X-ENDLIST` and
//! `#EXT-X-STREAM-INF` variants. Unknown tags are skipped.

use url::Url;

const TAG_HEADER: &str = "#EXTM3U";
const TAG_TARGET_DURATION: &str = "#EXT-X-TARGETDURATION:";
const TAG_MEDIA_SEQUENCE: &str = "#EXT-X-MEDIA-SEQUENCE:";
const TAG_SEGMENT: &str = "#EXTINF:";
const TAG_END_LIST: &str = "#EXT-X-ENDLIST";
const TAG_STREAM_INF: &str = "#EXT-X-STREAM-INF:";

/// A parsed playlist: either a list of variants or a list of segments.
#[derive(Debug, Clone, PartialEq)]
pub enum Playlist {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MasterPlaylist {
    pub variants: Vec<Variant>,
}

/// One rendition listed by a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub bandwidth: Option<u64>,
    /// URI as written in the playlist (possibly relative).
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaPlaylist {
    /// Upper bound of any segment duration, in seconds.
    pub target_duration: u64,
    /// Sequence number of the first segment.
    pub media_sequence: u64,
    pub segments: Vec<MediaSegment>,
    /// `#EXT-X-ENDLIST` was present; no more segments will be added.
    pub ended: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaSegment {
    pub sequence: u64,
    /// Duration in seconds from `#EXTINF`.
    pub duration: f64,
    pub uri: String,
}

/// Errors raised while parsing a playlist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaylistError {
    #[error("missing #EXTM3U header")]
    MissingHeader,

    #[error("line {line}: invalid value for {tag}: {value}")]
    InvalidTag {
        line: usize,
        tag: &'static str,
        value: String,
    },

    #[error("line {line}: URI without a preceding #EXTINF or #EXT-X-STREAM-INF")]
    UnexpectedUri { line: usize },

    #[error("{0} tag has no URI line")]
    MissingUri(&'static str),

    #[error("media playlist without #EXT-X-TARGETDURATION")]
    MissingTargetDuration,

    #[error("master playlist lists no variants")]
    NoVariants,

    #[error("cannot resolve URI '{0}'")]
    InvalidUri(String),
}

/// What the next URI line belongs to.
enum Pending {
    None,
    Segment(f64),
    Variant(Option<u64>),
}

/// Parse playlist text.
pub fn parse(text: &str) -> Result<Playlist, PlaylistError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    match lines.next() {
        Some((_, TAG_HEADER)) => {}
        _ => return Err(PlaylistError::MissingHeader),
    }

    let mut target_duration: Option<u64> = None;
    let mut media_sequence: u64 = 0;
    let mut segments: Vec<MediaSegment> = Vec::new();
    let mut variants: Vec<Variant> = Vec::new();
    let mut ended = false;
    let mut pending = Pending::None;

    for (line_no, line) in lines {
        if let Some(value) = line.strip_prefix(TAG_TARGET_DURATION) {
            target_duration = Some(parse_number(line_no, "EXT-X-TARGETDURATION", value)?);
        } else if let Some(value) = line.strip_prefix(TAG_MEDIA_SEQUENCE) {
            media_sequence = parse_number(line_no, "EXT-X-MEDIA-SEQUENCE", value)?;
        } else if let Some(value) = line.strip_prefix(TAG_SEGMENT) {
            let duration_str = value.split(',').next().unwrap_or_default().trim();
            let duration = duration_str
                .parse::<f64>()
                .map_err(|_| PlaylistError::InvalidTag {
                    line: line_no,
                    tag: "EXTINF",
                    value: duration_str.to_string(),
                })?;
            pending = Pending::Segment(duration);
        } else if let Some(attrs) = line.strip_prefix(TAG_STREAM_INF) {
            pending = Pending::Variant(bandwidth_attribute(attrs));
        } else if line == TAG_END_LIST {
            ended = true;
        } else if line.starts_with('#') {
            // Unsupported tag or comment.
        } else {
            match std::mem::replace(&mut pending, Pending::None) {
                Pending::Segment(duration) => {
                    // The sequence after this one must also be representable.
                    let sequence = media_sequence
                        .checked_add(segments.len() as u64)
                        .filter(|s| *s < u64::MAX)
                        .ok_or_else(|| PlaylistError::InvalidTag {
                            line: line_no,
                            tag: "EXT-X-MEDIA-SEQUENCE",
                            value: media_sequence.to_string(),
                        })?;
                    segments.push(MediaSegment {
                        sequence,
                        duration,
                        uri: line.to_string(),
                    });
                }
                Pending::Variant(bandwidth) => variants.push(Variant {
                    bandwidth,
                    uri: line.to_string(),
                }),
                Pending::None => return Err(PlaylistError::UnexpectedUri { line: line_no }),
            }
        }
    }

    match pending {
        Pending::Segment(_) => return Err(PlaylistError::MissingUri("EXTINF")),
        Pending::Variant(_) => return Err(PlaylistError::MissingUri("EXT-X-STREAM-INF")),
        Pending::None => {}
    }

    if !variants.is_empty() {
        return Ok(Playlist::Master(MasterPlaylist { variants }));
    }

    Ok(Playlist::Media(MediaPlaylist {
        target_duration: target_duration.ok_or(PlaylistError::MissingTargetDuration)?,
        media_sequence,
        segments,
        ended,
    }))
}

/// Resolve a playlist URI against the URL the playlist was loaded from.
pub fn resolve_uri(base: &Url, uri: &str) -> Result<Url, PlaylistError> {
    base.join(uri)
        .map_err(|_| PlaylistError::InvalidUri(uri.to_string()))
}

fn parse_number(line: usize, tag: &'static str, value: &str) -> Result<u64, PlaylistError> {
    value.trim().parse().map_err(|_| PlaylistError::InvalidTag {
        line,
        tag,
        value: value.to_string(),
    })
}

/// Extract `BANDWIDTH=` from an attribute list. Quoted attributes (e.g.
/// `CODECS="a,b"`) may contain commas, so only top-level commas split.
fn bandwidth_attribute(attrs: &str) -> Option<u64> {
    let mut in_quotes = false;
    let mut start = 0;
    let mut pairs = Vec::new();
    for (i, c) in attrs.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                pairs.push(&attrs[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pairs.push(&attrs[start..]);

    pairs
        .into_iter()
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == "BANDWIDTH")
        .and_then(|(_, value)| value.trim().parse().ok())
}
