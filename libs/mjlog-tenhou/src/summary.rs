//! mjlog summarizer
//!
//! An mjlog is an XML document, usually gzip-compressed:
//!
//! ```text
//! <mjloggm ver="2.3">
//!   <GO type="169" lobby="0"/>
//!   <UN n0="%41..." n1="..." n2="..." n3="..." dan="..." rate="..." sx="..."/>
//!   ...
//!   <AGARI ... owari="390,49.0,236,4.0,199,-20.0,175,-33.0"/>
//! </mjloggm>
//! ```
//!
//! `owari` on the last AGARI/RYUUKYOKU holds the final score (in hundreds) and
//! the uma-adjusted points of every seat.

use std::io::Read;

use flate2::read::GzDecoder;
use mjlog_domain::{
    ingestion::{GameSummary, Standing, SummarizeError},
    ports::Summarizer,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const SEATS: [&str; 4] = ["n0", "n1", "n2", "n3"];

/// Summarizer port implementation for Tenhou mjlog files
#[derive(Debug, Clone, Copy, Default)]
pub struct MjlogSummarizer;

impl MjlogSummarizer {
    pub fn new() -> Self {
        Self
    }
}

impl Summarizer for MjlogSummarizer {
    fn summarize(&self, data: &[u8]) -> Result<GameSummary, SummarizeError> {
        let xml = decode(data)?;
        let game = scan(&xml)?;

        let kind = game
            .kind
            .ok_or_else(|| SummarizeError::parse("missing <GO> tag"))?;
        let players = game
            .players
            .ok_or_else(|| SummarizeError::parse("missing <UN> tag"))?;
        if players.is_empty() {
            return Err(SummarizeError::parse("no players in <UN> tag"));
        }

        let owari = game
            .owari
            .ok_or_else(|| SummarizeError::parse("missing owari, game did not finish"))?;
        let results = final_results(&owari)?;
        if results.len() < players.len() {
            return Err(SummarizeError::parse(format!(
                "owari has {} results for {} players",
                results.len(),
                players.len()
            )));
        }

        let mut standings: Vec<Standing> = players
            .into_iter()
            .zip(results)
            .map(|(name, (score, points))| Standing {
                name,
                score,
                points,
            })
            .collect();
        // Stable: equal scores keep seat order, which is how Tenhou breaks ties
        standings.sort_by(|a, b| b.score.cmp(&a.score));

        Ok(GameSummary {
            title: game_title(kind),
            standings,
        })
    }
}

/// Display name of a game from its `GO type` bitfield (e.g. 169 → "四鳳南喰赤")
pub fn game_title(kind: u32) -> String {
    let mut title = String::new();
    title.push(if kind & 0x10 != 0 { '三' } else { '四' });
    title.push(match kind & 0xA0 {
        0x00 => '般',
        0x80 => '上',
        0x20 => '特',
        _ => '鳳',
    });
    title.push(if kind & 0x08 != 0 { '南' } else { '東' });
    if kind & 0x04 == 0 {
        title.push('喰');
    }
    if kind & 0x02 == 0 {
        title.push('赤');
    }
    if kind & 0x40 != 0 {
        title.push('速');
    }
    title
}

fn decode(data: &[u8]) -> Result<String, SummarizeError> {
    if data.starts_with(&GZIP_MAGIC) {
        let mut xml = String::new();
        GzDecoder::new(data)
            .read_to_string(&mut xml)
            .map_err(|e| SummarizeError::decode(format!("gzip: {}", e)))?;
        Ok(xml)
    } else {
        String::from_utf8(data.to_vec()).map_err(|e| SummarizeError::decode(e.to_string()))
    }
}

/// Fields of interest collected in one pass over the document
#[derive(Debug, Default)]
struct ScannedGame {
    kind: Option<u32>,
    players: Option<Vec<String>>,
    /// `owari` of the last AGARI/RYUUKYOKU carrying one
    owari: Option<String>,
}

fn scan(xml: &str) -> Result<ScannedGame, SummarizeError> {
    let mut reader = Reader::from_str(xml);
    let mut game = ScannedGame::default();
    let mut root_seen = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| SummarizeError::parse(format!("invalid XML: {}", e)))?;

        let tag = match event {
            Event::Start(tag) | Event::Empty(tag) => tag,
            Event::Eof => break,
            _ => continue,
        };

        if !root_seen {
            if tag.name().as_ref() != b"mjloggm" {
                return Err(SummarizeError::parse("missing <mjloggm> root element"));
            }
            root_seen = true;
            continue;
        }

        match tag.name().as_ref() {
            b"GO" if game.kind.is_none() => {
                let kind = attribute(&tag, "type")?
                    .ok_or_else(|| SummarizeError::parse("missing game type"))?;
                let kind = kind
                    .parse::<u32>()
                    .map_err(|e| SummarizeError::parse(format!("invalid game type: {}", e)))?;
                game.kind = Some(kind);
            }
            // Later UN tags announce reconnections and only repeat some seats
            b"UN" if game.players.is_none() => {
                game.players = Some(player_names(&tag)?);
            }
            b"AGARI" | b"RYUUKYOKU" => {
                if let Some(owari) = attribute(&tag, "owari")? {
                    game.owari = Some(owari);
                }
            }
            _ => {}
        }
    }

    if !root_seen {
        return Err(SummarizeError::parse("missing <mjloggm> root element"));
    }
    Ok(game)
}

/// Unescaped value of an attribute, `None` when absent
fn attribute(tag: &BytesStart<'_>, key: &str) -> Result<Option<String>, SummarizeError> {
    let Some(attr) = tag
        .try_get_attribute(key)
        .map_err(|e| SummarizeError::parse(format!("invalid attribute {}: {}", key, e)))?
    else {
        return Ok(None);
    };

    attr.unescape_value()
        .map(|value| Some(value.into_owned()))
        .map_err(|e| SummarizeError::parse(format!("invalid value for {}: {}", key, e)))
}

/// Seated players in seat order; names are percent-encoded UTF-8
fn player_names(tag: &BytesStart<'_>) -> Result<Vec<String>, SummarizeError> {
    let mut players = Vec::with_capacity(SEATS.len());
    for seat in SEATS {
        let raw = attribute(tag, seat)?.unwrap_or_default();
        if raw.is_empty() {
            continue;
        }
        let name = urlencoding::decode(&raw)
            .map_err(|e| SummarizeError::parse(format!("invalid player name: {}", e)))?;
        players.push(name.into_owned());
    }
    Ok(players)
}

/// `(score, points)` per seat from an `owari` value
///
/// Scores are stored in hundreds of points.
fn final_results(owari: &str) -> Result<Vec<(i32, f64)>, SummarizeError> {
    let fields: Vec<&str> = owari.split(',').map(str::trim).collect();
    if fields.len() % 2 != 0 {
        return Err(SummarizeError::parse("owari has an odd number of fields"));
    }

    fields
        .chunks(2)
        .map(|pair| -> Result<(i32, f64), SummarizeError> {
            let hundreds = pair[0]
                .parse::<i32>()
                .map_err(|e| SummarizeError::parse(format!("invalid score '{}': {}", pair[0], e)))?;
            let score = hundreds
                .checked_mul(100)
                .ok_or_else(|| SummarizeError::parse(format!("score '{}' out of range", pair[0])))?;
            let points = pair[1]
                .parse::<f64>()
                .map_err(|e| SummarizeError::parse(format!("invalid points '{}': {}", pair[1], e)))?;
            Ok((score, points))
        })
        .collect()
}
