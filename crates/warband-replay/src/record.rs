//! The [`ActionRecord`] tree stored in the action log.
//!
//! A record is a tag plus ordered attributes plus child records. Commands,
//! user-choice answers, random seeds and checkup fingerprints are all
//! records; they differ only by tag and by the `dependent` flag, which marks
//! records that belong to the command before them rather than starting a
//! new one.

use indexmap::IndexMap;
use std::fmt;

use warband_core::{CommandError, Location, Path, SideId, UnitId};

use crate::error::ReplayError;

/// Well-known record tags.
pub mod tags {
    /// Recruit a unit from the catalog.
    pub const RECRUIT: &str = "recruit";
    /// Recall a unit from a side's roster.
    pub const RECALL: &str = "recall";
    /// Move a unit along a path.
    pub const MOVE: &str = "move";
    /// Remove a unit from a side's roster.
    pub const DISBAND: &str = "disband";
    /// Attack a unit.
    pub const ATTACK: &str = "attack";
    /// Fire a named scripted event.
    pub const FIRE_EVENT: &str = "fire_event";
    /// Toggle automatic shroud updates.
    pub const AUTO_SHROUD: &str = "auto_shroud";
    /// Force a fog/shroud recalculation.
    pub const UPDATE_SHROUD: &str = "update_shroud";
    /// Start a side turn.
    pub const INIT_SIDE: &str = "init_side";
    /// End the current side turn.
    pub const END_TURN: &str = "end_turn";
    /// Fingerprint recorded after a command.
    pub const CHECKUP: &str = "checkup";
    /// Seed for the synced random provider.
    pub const RANDOM_SEED: &str = "random_seed";
    /// Child of `recruit`/`recall` holding the leader's hex.
    pub const FROM: &str = "from";
    /// Child of `fire_event` binding a scenario variable.
    pub const SET_VARIABLE: &str = "set_variable";
    /// Child of `attack` holding the attacker's hex.
    pub const SOURCE: &str = "source";
    /// Child of `attack` holding the defender's hex.
    pub const DESTINATION: &str = "destination";

    /// Shroud bookkeeping commands; skipped when undo reverts the log.
    pub fn is_shroud_bookkeeping(tag: &str) -> bool {
        tag == AUTO_SHROUD || tag == UPDATE_SHROUD
    }
}

/// An attribute value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttrValue {
    /// A boolean.
    Bool(bool),
    /// A signed integer. Unsigned 64-bit values are stored bit-cast.
    Int(i64),
    /// Free text.
    Text(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            AttrValue::Int(i) => write!(f, "{i}"),
            AttrValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v.into())
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        AttrValue::Int(v.into())
    }
}

impl From<u64> for AttrValue {
    fn from(v: u64) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<usize> for AttrValue {
    fn from(v: usize) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

impl From<SideId> for AttrValue {
    fn from(v: SideId) -> Self {
        AttrValue::Int(v.0.into())
    }
}

/// One entry in the action log.
///
/// # Examples
///
/// ```
/// use warband_replay::{tags, ActionRecord};
/// use warband_core::Location;
///
/// let rec = ActionRecord::new(tags::RECRUIT)
///     .with("type", "Elvish Fighter")
///     .with("side", 1)
///     .with_location(Location::new(3, 2));
///
/// assert_eq!(rec.get_str("type"), Some("Elvish Fighter"));
/// assert_eq!(rec.location().unwrap(), Location::new(3, 2));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionRecord {
    /// Record tag: a command name, a choice name, or a bookkeeping tag.
    pub tag: String,
    /// Ordered attributes.
    pub attrs: IndexMap<String, AttrValue>,
    /// Nested records.
    pub children: Vec<ActionRecord>,
    /// Belongs to the preceding command (seed, choice answer, checkup).
    pub dependent: bool,
    /// Side that produced a choice answer.
    pub from_side: Option<SideId>,
    /// The answering side was not entitled to answer.
    pub side_invalid: bool,
}

impl ActionRecord {
    /// A command record with no attributes.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: IndexMap::new(),
            children: Vec::new(),
            dependent: false,
            from_side: None,
            side_invalid: false,
        }
    }

    /// A record belonging to the preceding command.
    pub fn dependent(tag: &str) -> Self {
        Self {
            dependent: true,
            ..Self::new(tag)
        }
    }

    /// Builder: set an attribute.
    pub fn with(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder: set `x` and `y`.
    pub fn with_location(mut self, loc: Location) -> Self {
        self.set("x", loc.x);
        self.set("y", loc.y);
        self
    }

    /// Builder: store a path as comma-separated `x` and `y` lists.
    pub fn with_path(mut self, path: &[Location]) -> Self {
        let xs: Vec<String> = path.iter().map(|l| l.x.to_string()).collect();
        let ys: Vec<String> = path.iter().map(|l| l.y.to_string()).collect();
        self.set("x", xs.join(","));
        self.set("y", ys.join(","));
        self
    }

    /// Builder: add a child record.
    pub fn with_child(mut self, child: ActionRecord) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: mark the answering side.
    pub fn with_from_side(mut self, side: SideId) -> Self {
        self.from_side = Some(side);
        self
    }

    /// Set an attribute, replacing any previous value in place.
    pub fn set(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    /// Raw attribute.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Integer attribute. Text that parses as an integer is accepted.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.attrs.get(key)? {
            AttrValue::Int(i) => Some(*i),
            AttrValue::Text(s) => s.trim().parse().ok(),
            AttrValue::Bool(_) => None,
        }
    }

    /// Unsigned 64-bit attribute stored bit-cast in an integer.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get_int(key).map(|i| i as u64)
    }

    /// Boolean attribute. `yes`/`no`/`true`/`false` text is accepted.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.attrs.get(key)? {
            AttrValue::Bool(b) => Some(*b),
            AttrValue::Text(s) => match s.as_str() {
                "yes" | "true" => Some(true),
                "no" | "false" => Some(false),
                _ => None,
            },
            AttrValue::Int(_) => None,
        }
    }

    /// Text attribute.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.attrs.get(key)? {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn missing(&self, key: &str) -> CommandError {
        CommandError::MissingAttribute {
            tag: self.tag.clone(),
            key: key.to_string(),
        }
    }

    fn invalid(&self, key: &str) -> CommandError {
        CommandError::InvalidAttribute {
            key: key.to_string(),
            value: self
                .attrs
                .get(key)
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }

    /// Integer attribute, or a heavy command error.
    pub fn require_int(&self, key: &str) -> Result<i64, CommandError> {
        if !self.attrs.contains_key(key) {
            return Err(self.missing(key));
        }
        self.get_int(key).ok_or_else(|| self.invalid(key))
    }

    /// Text attribute, or a heavy command error.
    pub fn require_str(&self, key: &str) -> Result<&str, CommandError> {
        if !self.attrs.contains_key(key) {
            return Err(self.missing(key));
        }
        self.get_str(key).ok_or_else(|| self.invalid(key))
    }

    /// Side attribute, or a heavy command error.
    pub fn require_side(&self, key: &str) -> Result<SideId, CommandError> {
        let v = self.require_int(key)?;
        u32::try_from(v)
            .ok()
            .filter(|&s| s > 0)
            .map(SideId)
            .ok_or_else(|| self.invalid(key))
    }

    /// Unit id attribute, or a heavy command error. Negative ids are invalid.
    pub fn require_unit(&self, key: &str) -> Result<UnitId, CommandError> {
        let v = self.require_int(key)?;
        u64::try_from(v).map(UnitId).map_err(|_| self.invalid(key))
    }

    /// The `x`/`y` location.
    pub fn location(&self) -> Result<Location, CommandError> {
        let x = self.require_int("x")?;
        let y = self.require_int("y")?;
        let x = i32::try_from(x).map_err(|_| self.invalid("x"))?;
        let y = i32::try_from(y).map_err(|_| self.invalid("y"))?;
        Ok(Location::new(x, y))
    }

    /// The path stored by [`with_path`](Self::with_path).
    pub fn path(&self) -> Result<Path, CommandError> {
        let xs = self.require_str("x")?;
        let ys = self.require_str("y")?;
        let parse = |s: &str| -> Result<Vec<i32>, CommandError> {
            s.split(',')
                .map(|p| {
                    p.trim()
                        .parse::<i32>()
                        .map_err(|_| CommandError::InvalidPath(s.to_string()))
                })
                .collect()
        };
        let xs = parse(xs)?;
        let ys = parse(ys)?;
        if xs.len() != ys.len() {
            return Err(CommandError::InvalidPath(format!(
                "{} x values, {} y values",
                xs.len(),
                ys.len()
            )));
        }
        Ok(xs
            .into_iter()
            .zip(ys)
            .map(|(x, y)| Location::new(x, y))
            .collect())
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&ActionRecord> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All children with the given tag.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a ActionRecord> {
        self.children.iter().filter(move |c| c.tag == tag)
    }
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.tag)?;
        for (k, v) in &self.attrs {
            write!(f, " {k}={v}")?;
        }
        if self.dependent {
            f.write_str(" dependent")?;
        }
        if let Some(side) = self.from_side {
            write!(f, " from_side={side}")?;
        }
        if self.side_invalid {
            f.write_str(" side_invalid")?;
        }
        for c in &self.children {
            write!(f, " {c}")?;
        }
        f.write_str("]")
    }
}

/// What a checkup compares between two executions of one command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fingerprint {
    /// Random values drawn by the command.
    pub random_calls: u64,
    /// Next unit id after the command. Absent in logs from older peers.
    pub next_unit_id: Option<u64>,
    /// Checksum of randomly resolved objects the command created.
    pub checksum: Option<u64>,
}

impl Fingerprint {
    /// Encode as a dependent `checkup` record.
    pub fn to_record(&self) -> ActionRecord {
        let mut rec = ActionRecord::dependent(tags::CHECKUP).with("random_calls", self.random_calls);
        if let Some(id) = self.next_unit_id {
            rec.set("next_unit_id", id);
        }
        if let Some(sum) = self.checksum {
            rec.set("checksum", sum);
        }
        rec
    }

    /// Decode a `checkup` record.
    pub fn from_record(rec: &ActionRecord) -> Result<Self, ReplayError> {
        if rec.tag != tags::CHECKUP {
            return Err(ReplayError::MalformedRecord {
                detail: format!("expected [{}], found [{}]", tags::CHECKUP, rec.tag),
            });
        }
        let random_calls = rec
            .get_u64("random_calls")
            .ok_or_else(|| ReplayError::MalformedRecord {
                detail: "checkup without random_calls".into(),
            })?;
        Ok(Self {
            random_calls,
            next_unit_id: rec.get_u64("next_unit_id"),
            checksum: rec.get_u64("checksum"),
        })
    }
}
