//! Club name canonicalization and the per-club ideal smash factor registry.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SwingError};

// ── Club catalog ─────────────────────────────────────────────────────────────

/// Wedge families recognised by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Wedge {
    Pitching,
    Gap,
    Sand,
    Lob,
}

/// A recognised club. Variant order is the bag order used for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClubKind {
    Driver,
    Wood(u8),
    Hybrid(u8),
    Iron(u8),
    Wedge(Wedge),
    Putter,
}

impl ClubKind {
    /// Every club in the catalog, in bag order.
    pub fn catalog() -> Vec<ClubKind> {
        let mut all = vec![ClubKind::Driver];
        all.extend((2..=9).map(ClubKind::Wood));
        all.extend((2..=7).map(ClubKind::Hybrid));
        all.extend((1..=9).map(ClubKind::Iron));
        all.extend(
            [Wedge::Pitching, Wedge::Gap, Wedge::Sand, Wedge::Lob]
                .into_iter()
                .map(ClubKind::Wedge),
        );
        all.push(ClubKind::Putter);
        all
    }

    /// Display name used as the canonical club identifier.
    pub fn canonical_name(&self) -> String {
        match self {
            ClubKind::Driver => "Driver".to_string(),
            ClubKind::Wood(n) => format!("{n} Wood"),
            ClubKind::Hybrid(n) => format!("{n} Hybrid"),
            ClubKind::Iron(n) => format!("{n} Iron"),
            ClubKind::Wedge(Wedge::Pitching) => "Pitching Wedge".to_string(),
            ClubKind::Wedge(Wedge::Gap) => "Gap Wedge".to_string(),
            ClubKind::Wedge(Wedge::Sand) => "Sand Wedge".to_string(),
            ClubKind::Wedge(Wedge::Lob) => "Lob Wedge".to_string(),
            ClubKind::Putter => "Putter".to_string(),
        }
    }

    /// Parse a free-form club name.
    ///
    /// Matching ignores case, whitespace, `-`, `_` and `.`, so `"7 Iron"`,
    /// `"7-iron"`, `"7i"` and `" 7 IRON "` all resolve to `Iron(7)`.
    pub fn parse(raw: &str) -> Option<ClubKind> {
        let key: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_' | '.'))
            .flat_map(char::to_lowercase)
            .collect();
        if key.is_empty() {
            return None;
        }

        match key.as_str() {
            "driver" | "dr" | "drv" | "1w" | "1wood" => return Some(ClubKind::Driver),
            "pw" | "pitchingwedge" | "pitching" => return Some(ClubKind::Wedge(Wedge::Pitching)),
            "gw" | "aw" | "uw" | "gapwedge" | "approachwedge" | "gap" => {
                return Some(ClubKind::Wedge(Wedge::Gap))
            }
            "sw" | "sandwedge" | "sand" => return Some(ClubKind::Wedge(Wedge::Sand)),
            "lw" | "lobwedge" | "lob" => return Some(ClubKind::Wedge(Wedge::Lob)),
            "putter" | "pt" | "putt" => return Some(ClubKind::Putter),
            _ => {}
        }

        let caps = numbered_club_regex().captures(&key)?;
        let number = caps
            .name("lead")
            .or_else(|| caps.name("trail"))?
            .as_str()
            .parse::<u8>()
            .ok()?;
        let family = caps
            .name("family")
            .or_else(|| caps.name("prefix"))?
            .as_str();

        let kind = match family {
            "w" | "wd" | "wood" | "fw" | "fairway" | "fairwaywood" => ClubKind::Wood(number),
            "h" | "hy" | "hyb" | "hybrid" | "rescue" | "ut" | "utility" => {
                ClubKind::Hybrid(number)
            }
            "i" | "ir" | "iron" => ClubKind::Iron(number),
            _ => return None,
        };

        match kind {
            ClubKind::Wood(n) if (2..=9).contains(&n) => Some(kind),
            ClubKind::Hybrid(n) if (2..=7).contains(&n) => Some(kind),
            ClubKind::Iron(n) if (1..=9).contains(&n) => Some(kind),
            _ => None,
        }
    }
}

/// `7iron`, `3w`, `4hybrid` (number first) or `iron7`, `w3` (family first).
fn numbered_club_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:(?P<lead>\d)(?P<family>[a-z]+)|(?P<prefix>[a-z]+)(?P<trail>\d))$",
        )
        .expect("regex is valid")
    })
}

/// Result of canonicalizing a raw club name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalClub {
    /// Canonical name, or the trimmed raw name when unrecognised.
    pub name: String,
    /// The catalog entry, `None` for unknown clubs.
    pub kind: Option<ClubKind>,
}

impl CanonicalClub {
    pub fn is_known(&self) -> bool {
        self.kind.is_some()
    }
}

/// Canonicalize a club name through the catalog.
///
/// Unrecognised names are kept verbatim (only surrounding whitespace is
/// removed) and flagged as unknown.
pub fn canonicalize_club(raw: &str) -> CanonicalClub {
    match ClubKind::parse(raw) {
        Some(kind) => CanonicalClub {
            name: kind.canonical_name(),
            kind: Some(kind),
        },
        None => CanonicalClub {
            name: raw.trim().to_string(),
            kind: None,
        },
    }
}

/// Sort key placing clubs in bag order: driver, woods, hybrids, irons,
/// wedges, putter, then unknown clubs alphabetically.
pub fn club_sort_key(name: &str) -> (bool, Option<ClubKind>, String) {
    match ClubKind::parse(name) {
        Some(kind) => (false, Some(kind), String::new()),
        None => (true, None, name.to_lowercase()),
    }
}

/// Sort club names in place into bag order.
pub fn sort_clubs(clubs: &mut [String]) {
    clubs.sort_by_cached_key(|c| club_sort_key(c));
}

// ── Club profiles ────────────────────────────────────────────────────────────

/// Per-club constants used by the efficiency calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClubProfile {
    /// Smash factor a well-struck shot with this club should reach.
    pub ideal_smash_factor: f64,
}

impl ClubProfile {
    /// Validate and build a profile. The ideal must be finite and positive.
    pub fn new(ideal_smash_factor: f64) -> Result<Self> {
        if !ideal_smash_factor.is_finite() || ideal_smash_factor <= 0.0 {
            return Err(SwingError::Config(format!(
                "ideal smash factor must be positive, got {ideal_smash_factor}"
            )));
        }
        Ok(Self { ideal_smash_factor })
    }
}

/// Outcome of a profile lookup. Unknown clubs are never given a default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProfileLookup {
    Resolved { profile: ClubProfile },
    Unresolved,
}

impl ProfileLookup {
    pub fn profile(&self) -> Option<ClubProfile> {
        match self {
            ProfileLookup::Resolved { profile } => Some(*profile),
            ProfileLookup::Unresolved => None,
        }
    }
}

/// Default ideal smash factor for a catalog club.
///
/// These are commonly quoted range targets, not measured values; every one of
/// them can be replaced through [`ClubProfiles::with_overrides`].
fn default_ideal(kind: ClubKind) -> Option<f64> {
    match kind {
        ClubKind::Driver => Some(1.48),
        ClubKind::Wood(_) => Some(1.47),
        ClubKind::Hybrid(_) => Some(1.45),
        ClubKind::Iron(_) => Some(1.33),
        ClubKind::Wedge(_) => Some(1.25),
        ClubKind::Putter => None,
    }
}

/// Registry of club profiles keyed by canonical club name.
#[derive(Debug, Clone, Default)]
pub struct ClubProfiles {
    profiles: BTreeMap<String, ClubProfile>,
}

impl ClubProfiles {
    /// A registry with no profiles at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry populated with the built-in ideal smash factors.
    pub fn with_defaults() -> Self {
        let profiles = ClubKind::catalog()
            .into_iter()
            .filter_map(|kind| {
                default_ideal(kind).map(|ideal| {
                    (kind.canonical_name(), ClubProfile { ideal_smash_factor: ideal })
                })
            })
            .collect();
        Self { profiles }
    }

    /// Apply `club → ideal smash factor` overrides on top of this registry.
    ///
    /// Keys are canonicalized, so `"7i"` overrides `"7 Iron"`. Names outside
    /// the catalog are skipped with a warning.
    pub fn with_overrides(mut self, overrides: &HashMap<String, f64>) -> Result<Self> {
        for (club, ideal) in overrides {
            let profile = ClubProfile::new(*ideal)?;
            if !self.insert(club, profile) {
                warn!("Ignoring profile override for unknown club {:?}", club);
            }
        }
        Ok(self)
    }

    /// Insert or replace the profile for a catalog club. Returns `false`, and
    /// stores nothing, when `club` is not in the catalog.
    pub fn insert(&mut self, club: &str, profile: ClubProfile) -> bool {
        let canonical = canonicalize_club(club);
        if !canonical.is_known() {
            return false;
        }
        debug!("club profile {} -> {}", canonical.name, profile.ideal_smash_factor);
        self.profiles.insert(canonical.name, profile);
        true
    }

    /// Resolve the profile for `club` (canonicalized first). Clubs outside
    /// the catalog never resolve.
    pub fn resolve_ideal_smash_factor(&self, club: &str) -> ProfileLookup {
        let canonical = canonicalize_club(club);
        if !canonical.is_known() {
            return ProfileLookup::Unresolved;
        }
        match self.profiles.get(&canonical.name) {
            Some(profile) => ProfileLookup::Resolved { profile: *profile },
            None => ProfileLookup::Unresolved,
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Read a JSON override file of the form `{"7 Iron": 1.31}`.
    ///
    /// A missing file yields an empty map.
    pub fn load_overrides(path: &Path) -> Result<HashMap<String, f64>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(path).map_err(|source| SwingError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
