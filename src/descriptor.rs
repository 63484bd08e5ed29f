//! Grid descriptors and their authoring grammar.
//!
//! Every socket region and every placeable part is authored as a short string:
//!
//! ```text
//! <Role>[_T<tier>]_<sizeX>x<sizeY>_S<level|N>[<exposure>]_<name>
//! ```
//!
//! `exposure` is either canonical edge letters (`L`, `R`, `T`, `B` in that order)
//! or a full alignment (`FH` / `FV`). It may follow the level directly (`S2LR`) or
//! stand as its own segment (`S2_LR`). Examples: `Head_2x4_S2_LR_torso`,
//! `Tail_T2_1x1_SN_bolt`, `Tail_3x1_S1_FH_barrel`.

use crate::surrounding::{Alignment, Edges, SurroundingSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest tier a descriptor may declare.
pub const MIN_TIER: u8 = 1;
/// Highest tier a descriptor may declare.
pub const MAX_TIER: u8 = 6;

/// Whether a descriptor describes a receiving socket or a placeable part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridRole {
    /// A receiving socket region.
    Head,
    /// The footprint and requirements of a placeable part.
    Tail,
}

impl GridRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Head => "Head",
            Self::Tail => "Tail",
        }
    }
}

/// A parsed socket or part description.
///
/// Descriptors are created once per authored asset and shared behind an `Arc`;
/// rotating one always produces a new value. Every constructor validates, so a
/// descriptor always renders to a string that parses back to itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GridDescriptor {
    role: GridRole,
    tier: u8,
    size_x: u32,
    size_y: u32,
    surrounding: SurroundingSpec,
    name: String,
}

impl GridDescriptor {
    /// Creates a tier-1 descriptor.
    ///
    /// Fails when a size is zero, the name is empty, or the name's first segment
    /// would be read back as exposure.
    pub fn new(
        role: GridRole,
        size_x: u32,
        size_y: u32,
        surrounding: SurroundingSpec,
        name: impl Into<String>,
    ) -> Result<Self, ParseError> {
        if size_x == 0 || size_y == 0 {
            return Err(ParseError::InvalidSize(format!("{size_x}x{size_y}")));
        }
        let name = name.into();
        check_name(Exposure::of(surrounding), &name)?;
        Ok(Self {
            role,
            tier: MIN_TIER,
            size_x,
            size_y,
            surrounding,
            name,
        })
    }

    /// Replaces the tier (builder pattern). Fails outside `MIN_TIER..=MAX_TIER`.
    pub fn with_tier(mut self, tier: u8) -> Result<Self, ParseError> {
        if !(MIN_TIER..=MAX_TIER).contains(&tier) {
            return Err(ParseError::InvalidTier(format!("T{tier}")));
        }
        self.tier = tier;
        Ok(self)
    }

    /// Replaces the role (builder pattern).
    pub fn with_role(mut self, role: GridRole) -> Self {
        self.role = role;
        self
    }

    /// Parses an authoring string. Nothing is returned on failure.
    pub fn try_parse(text: &str) -> Result<Self, ParseError> {
        let result = parse(text);
        if let Err(err) = &result {
            log::debug!("rejected descriptor {text:?}: {err}");
        }
        result
    }

    pub fn role(&self) -> GridRole {
        self.role
    }

    /// Cell-size bucket. Heads and tails only fit when tiers match exactly.
    pub fn tier(&self) -> u8 {
        self.tier
    }

    /// Width in cells.
    pub fn size_x(&self) -> u32 {
        self.size_x
    }

    /// Height in cells.
    pub fn size_y(&self) -> u32 {
        self.size_y
    }

    pub fn surrounding(&self) -> SurroundingSpec {
        self.surrounding
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_head(&self) -> bool {
        self.role == GridRole::Head
    }

    pub fn is_tail(&self) -> bool {
        self.role == GridRole::Tail
    }

    /// Number of cells covered.
    pub fn area(&self) -> u64 {
        u64::from(self.size_x) * u64::from(self.size_y)
    }

    /// The same descriptor with a new shape. Rotation keeps both sizes positive
    /// and the exposure kind, so the name stays unambiguous.
    pub(crate) fn reshaped(&self, size_x: u32, size_y: u32, surrounding: SurroundingSpec) -> Self {
        Self {
            size_x,
            size_y,
            surrounding,
            ..self.clone()
        }
    }
}

/// Why a descriptor string was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// The input was empty.
    Empty,
    /// The leading token was neither `Head` nor `Tail`.
    UnknownRole(String),
    /// A `T` segment did not hold an integer in `1..=6`.
    InvalidTier(String),
    /// The size segment was not `<x>x<y>` with positive integers.
    InvalidSize(String),
    /// The `S` segment did not start with an integer or `N`.
    InvalidLevel(String),
    /// Exposure letters were unknown, repeated, or out of `LRTB` order.
    InvalidEdges(String),
    /// Edge letters and a full alignment were both given.
    ConflictingSurrounding(String),
    /// The name starts with a segment that would be read as exposure.
    AmbiguousName(String),
    /// A required segment was absent.
    MissingSegment(&'static str),
    /// Nothing was left for the name.
    MissingName,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty descriptor"),
            Self::UnknownRole(token) => write!(f, "unknown role {token:?}"),
            Self::InvalidTier(token) => {
                write!(f, "invalid tier {token:?}, expected T{MIN_TIER}..T{MAX_TIER}")
            }
            Self::InvalidSize(token) => write!(f, "invalid size {token:?}"),
            Self::InvalidLevel(token) => write!(f, "invalid surrounding level {token:?}"),
            Self::InvalidEdges(token) => write!(f, "invalid edge letters {token:?}"),
            Self::ConflictingSurrounding(token) => {
                write!(f, "edges and full alignment both given in {token:?}")
            }
            Self::AmbiguousName(name) => {
                write!(f, "name {name:?} would be read as exposure")
            }
            Self::MissingSegment(what) => write!(f, "missing {what} segment"),
            Self::MissingName => write!(f, "missing name"),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Exposure {
    Edges(Edges),
    Full(Alignment),
}

impl Exposure {
    fn of(spec: SurroundingSpec) -> Option<Self> {
        match spec.alignment() {
            Alignment::None if spec.edges().is_empty() => None,
            Alignment::None => Some(Self::Edges(spec.edges())),
            alignment => Some(Self::Full(alignment)),
        }
    }

    fn into_spec(self, level: u32) -> SurroundingSpec {
        match self {
            Self::Edges(edges) => SurroundingSpec::with_edges(level, edges),
            Self::Full(alignment) => SurroundingSpec::full(level, alignment),
        }
    }

    fn same_kind(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Edges(_), Self::Edges(_)) | (Self::Full(_), Self::Full(_))
        )
    }
}

fn parse(text: &str) -> Result<GridDescriptor, ParseError> {
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    let segments: Vec<&str> = text.split('_').collect();
    let mut rest = segments.as_slice();

    let role = match take(&mut rest, "role")? {
        "Head" => GridRole::Head,
        "Tail" => GridRole::Tail,
        other => return Err(ParseError::UnknownRole(other.to_string())),
    };

    let mut token = take(&mut rest, "size")?;
    let mut tier = MIN_TIER;
    if let Some(digits) = token.strip_prefix('T') {
        tier = parse_digits::<u8>(digits)
            .filter(|t| (MIN_TIER..=MAX_TIER).contains(t))
            .ok_or_else(|| ParseError::InvalidTier(token.to_string()))?;
        token = take(&mut rest, "size")?;
    }

    let (size_x, size_y) = parse_size(token)?;

    let token = take(&mut rest, "surrounding")?;
    let (level, inline) = parse_level(token)?;

    let exposure = if !inline.is_empty() {
        Some(parse_exposure(inline)?)
    } else {
        take_exposure(&mut rest)?
    };

    if let Some(found) = exposure
        && let Some(next) = peek_exposure(rest)?
        && !found.same_kind(next)
    {
        return Err(ParseError::ConflictingSurrounding(rest[0].to_string()));
    }

    let name = rest.join("_");
    if name.is_empty() {
        return Err(ParseError::MissingName);
    }

    let surrounding = exposure
        .unwrap_or(Exposure::Edges(Edges::NONE))
        .into_spec(level);

    Ok(GridDescriptor {
        role,
        tier,
        size_x,
        size_y,
        surrounding,
        name,
    })
}

fn take<'a>(rest: &mut &[&'a str], what: &'static str) -> Result<&'a str, ParseError> {
    let segments = *rest;
    let (first, tail) = segments
        .split_first()
        .ok_or(ParseError::MissingSegment(what))?;
    *rest = tail;
    Ok(*first)
}

fn parse_size(token: &str) -> Result<(u32, u32), ParseError> {
    let invalid = || ParseError::InvalidSize(token.to_string());
    let (x, y) = token.split_once('x').ok_or_else(invalid)?;
    let x = parse_digits::<u32>(x).ok_or_else(invalid)?;
    let y = parse_digits::<u32>(y).ok_or_else(invalid)?;
    if x == 0 || y == 0 {
        return Err(invalid());
    }
    Ok((x, y))
}

/// Plain decimal digits only; no sign and no whitespace.
fn parse_digits<T: FromStr>(token: &str) -> Option<T> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Splits `S<level|N><inline exposure>` into the level and whatever follows it.
fn parse_level(token: &str) -> Result<(u32, &str), ParseError> {
    let invalid = || ParseError::InvalidLevel(token.to_string());
    let body = token.strip_prefix('S').ok_or_else(invalid)?;
    if let Some(inline) = body.strip_prefix('N') {
        return Ok((0, inline));
    }
    let digits = body.len() - body.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return Err(invalid());
    }
    let level = parse_digits::<u32>(&body[..digits]).ok_or_else(invalid)?;
    Ok((level, &body[digits..]))
}

fn parse_exposure(token: &str) -> Result<Exposure, ParseError> {
    match token {
        "FH" => return Ok(Exposure::Full(Alignment::Horizontal)),
        "FV" => return Ok(Exposure::Full(Alignment::Vertical)),
        _ => {}
    }
    if let Some(edges) = parse_edges(token) {
        return Ok(Exposure::Edges(edges));
    }
    if mixes_alignment(token) {
        Err(ParseError::ConflictingSurrounding(token.to_string()))
    } else {
        Err(ParseError::InvalidEdges(token.to_string()))
    }
}

/// Non-empty edge letters in strictly canonical order.
fn parse_edges(token: &str) -> Option<Edges> {
    let mut edges = Edges::NONE;
    let mut next = 0;
    for c in token.chars() {
        let position = Edges::LETTERS[next..]
            .iter()
            .position(|(_, letter)| *letter == c)?;
        edges |= Edges::LETTERS[next + position].0;
        next += position + 1;
    }
    (!edges.is_empty()).then_some(edges)
}

/// `true` for edge letters with `FH` or `FV` spliced in, such as `LFH`.
fn mixes_alignment(token: &str) -> bool {
    ["FH", "FV"].into_iter().any(|full| {
        token
            .split_once(full)
            .is_some_and(|(before, after)| parse_edges(&format!("{before}{after}")).is_some())
    })
}

/// Reads a standalone exposure segment, if the next segment is one and a name still
/// follows it. A segment that does not look like exposure belongs to the name.
fn peek_exposure(rest: &[&str]) -> Result<Option<Exposure>, ParseError> {
    if rest.len() < 2 {
        return Ok(None);
    }
    match parse_exposure(rest[0]) {
        Ok(exposure) => Ok(Some(exposure)),
        Err(err @ ParseError::ConflictingSurrounding(_)) => Err(err),
        Err(_) => Ok(None),
    }
}

fn take_exposure(rest: &mut &[&str]) -> Result<Option<Exposure>, ParseError> {
    let exposure = peek_exposure(rest)?;
    if exposure.is_some() {
        let segments = *rest;
        *rest = &segments[1..];
    }
    Ok(exposure)
}

/// Rejects names that would not survive a render and re-parse next to `exposure`.
fn check_name(exposure: Option<Exposure>, name: &str) -> Result<(), ParseError> {
    if name.is_empty() {
        return Err(ParseError::MissingName);
    }
    let segments: Vec<&str> = name.split('_').collect();
    match (exposure, peek_exposure(&segments)?) {
        (None, Some(_)) => Err(ParseError::AmbiguousName(name.to_string())),
        (Some(found), Some(next)) if !found.same_kind(next) => {
            Err(ParseError::ConflictingSurrounding(segments[0].to_string()))
        }
        _ => Ok(()),
    }
}

impl FromStr for GridDescriptor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s)
    }
}

impl TryFrom<String> for GridDescriptor {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_parse(&value)
    }
}

impl From<GridDescriptor> for String {
    fn from(value: GridDescriptor) -> Self {
        value.to_string()
    }
}

/// Renders the canonical authoring form: tier 1 is implicit, level 0 is `N`, and
/// exposure stands in its own segment.
impl fmt::Display for GridDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role.as_str())?;
        if self.tier != MIN_TIER {
            write!(f, "_T{}", self.tier)?;
        }
        write!(f, "_{}x{}_S", self.size_x, self.size_y)?;
        match self.surrounding.level() {
            0 => f.write_str("N")?,
            level => write!(f, "{level}")?,
        }
        match self.surrounding.alignment() {
            Alignment::Horizontal => f.write_str("_FH")?,
            Alignment::Vertical => f.write_str("_FV")?,
            Alignment::None if !self.surrounding.edges().is_empty() => {
                write!(f, "_{}", self.surrounding.edges().letters())?
            }
            Alignment::None => {}
        }
        write!(f, "_{}", self.name)
    }
}
