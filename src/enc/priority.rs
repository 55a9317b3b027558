// Draw Priorities
// Object type -> draw order table used for geometry identity keys

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use super::catalogue::object_codes::*;
use super::ObjectType;
use crate::config::{ConfigError, EngineConfig};

/// Unlisted classes sort after every listed one, by class code
pub const FALLBACK_OFFSET: u32 = 512;

/// Distance marks always sort next to last, soundings last
pub const SENTINEL_PRIORITIES: &[(u16, u32)] = &[(I_DISMAR, 0xFFFF_FFFE), (SOUNDG, 0xFFFF_FFFF)];

const fn class(code: u16) -> ObjectType {
    ObjectType::class_only(code)
}

/// Built-in draw order. Built-up areas are ordered by subtype, every other
/// class by class alone.
const BUILTIN_PRIORITIES: &[(ObjectType, u32)] = &[
    (class(LIGHTS), 0),
    (class(FOGSIG), 0),
    (class(CGUSTA), 1),
    (class(RSCSTA), 1),
    (ObjectType::new(BUAARE, 1), 2),
    (ObjectType::new(BUAARE, 5), 3),
    (ObjectType::new(BUAARE, 4), 4),
    (ObjectType::new(BUAARE, 3), 5),
    (ObjectType::new(BUAARE, 2), 6),
    (ObjectType::new(BUAARE, 6), 7),
    (ObjectType::new(BUAARE, 0), 8),
    (class(RDOSTA), 9),
    (class(RADSTA), 10),
    (class(RTPBCN), 11),
    (class(BCNISD), 12),
    (class(BCNLAT), 13),
    (class(I_BCNLAT), 13),
    (class(BCNSAW), 14),
    (class(BCNSPP), 15),
    (class(BOYCAR), 16),
    (class(BOYINB), 17),
    (class(BOYISD), 18),
    (class(BOYLAT), 19),
    (class(I_BOYLAT), 19),
    (class(BOYSAW), 20),
    (class(BOYSPP), 21),
    (class(MORFAC), 22),
    (class(OFSPLF), 23),
    (class(OBSTRN), 24),
    (class(WRECKS), 25),
    (class(UWTROC), 26),
    (class(WATTUR), 27),
    (class(CURENT), 28),
    (class(PILBOP), 29),
    (class(SISTAT), 30),
    (class(I_SISTAT), 30),
    (class(RDOCAL), 31),
    (class(I_RDOCAL), 31),
    (class(I_TRNBSN), 32),
    (class(HRBFAC), 33),
    (class(I_HRBFAC), 33),
    (class(PILPNT), 34),
    (class(ACHBRT), 35),
    (class(I_ACHBRT), 35),
    (class(CRANES), 36),
    (class(I_CRANES), 36),
    (class(I_WTWGAG), 37),
    (class(PYLONS), 38),
    (class(SLCONS), 39),
    (class(LNDMRK), 40),
    (class(SILTNK), 41),
    (class(LNDELV), 42),
    (class(SMCFAC), 43),
    (class(BUISGL), 44),
];

static BUILTIN: OnceLock<Arc<DrawPriorities>> = OnceLock::new();

/// Immutable draw priority table, built once and shared by `Arc`
#[derive(Debug, Clone)]
pub struct DrawPriorities {
    table: HashMap<ObjectType, u32>,
}

impl DrawPriorities {
    fn with_builtin_table() -> Self {
        let table = BUILTIN_PRIORITIES
            .iter()
            .copied()
            .chain(
                SENTINEL_PRIORITIES
                    .iter()
                    .map(|&(code, priority)| (class(code), priority)),
            )
            .collect();
        Self { table }
    }

    /// The process-wide built-in table
    pub fn builtin() -> Arc<Self> {
        Arc::clone(BUILTIN.get_or_init(|| Arc::new(Self::with_builtin_table())))
    }

    /// Built-in table plus the overrides of an engine configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let mut priorities = Self::with_builtin_table();

        for o in &config.priorities {
            if SENTINEL_PRIORITIES.iter().any(|&(code, _)| code == o.class) {
                return Err(ConfigError::Invalid(format!(
                    "priority of class {} is fixed",
                    o.class
                )));
            }
            if o.priority >= 0xFFFF_FFFE {
                return Err(ConfigError::Invalid(format!(
                    "priority {} of class {} is reserved",
                    o.priority, o.class
                )));
            }
            let key = ObjectType::new(o.class, o.subtype.unwrap_or(0));
            priorities.table.insert(key, o.priority);
        }

        log::debug!(
            "[ENC] Draw priority table: {} entries ({} overrides)",
            priorities.table.len(),
            config.priorities.len()
        );
        Ok(priorities)
    }

    /// Draw priority of an object type; lower draws first
    pub fn priority(&self, object_type: ObjectType) -> u32 {
        let found = if object_type.class() == BUAARE {
            self.table.get(&object_type)
        } else {
            self.table
                .get(&object_type)
                .or_else(|| self.table.get(&object_type.without_subtype()))
        };
        found
            .copied()
            .unwrap_or(object_type.class() as u32 + FALLBACK_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PriorityOverride;

    #[test]
    fn test_builtin_priorities() {
        let p = DrawPriorities::builtin();
        assert_eq!(p.priority(class(LIGHTS)), 0);
        assert_eq!(p.priority(ObjectType::new(LNDMRK, 3)), 40);
        assert_eq!(p.priority(ObjectType::new(BUAARE, 5)), 3);
        assert_eq!(p.priority(ObjectType::new(BUAARE, 0)), 8);
        assert_eq!(p.priority(class(I_BOYLAT)), 19);
    }

    #[test]
    fn test_fallback_and_sentinels() {
        let p = DrawPriorities::builtin();
        // Built-up area subtypes outside the table fall back
        assert_eq!(p.priority(ObjectType::new(BUAARE, 9)), 13 + FALLBACK_OFFSET);
        assert_eq!(p.priority(class(DEPARE)), 42 + FALLBACK_OFFSET);
        assert_eq!(p.priority(ObjectType::new(I_DISMAR, 3)), 0xFFFF_FFFE);
        assert_eq!(p.priority(class(SOUNDG)), 0xFFFF_FFFF);
    }

    #[test]
    fn test_builtin_table_shared() {
        assert!(Arc::ptr_eq(&DrawPriorities::builtin(), &DrawPriorities::builtin()));
    }

    #[test]
    fn test_config_overrides() {
        let config = EngineConfig {
            priorities: vec![
                PriorityOverride { class: DEPARE, subtype: None, priority: 100 },
                PriorityOverride { class: LNDMRK, subtype: Some(17), priority: 3 },
            ],
            ..Default::default()
        };
        let p = DrawPriorities::from_config(&config).unwrap();
        assert_eq!(p.priority(ObjectType::new(DEPARE, 4)), 100);
        assert_eq!(p.priority(ObjectType::new(LNDMRK, 17)), 3);
        assert_eq!(p.priority(ObjectType::new(LNDMRK, 1)), 40);
    }

    #[test]
    fn test_sentinels_cannot_be_overridden() {
        for (code, priority) in [(SOUNDG, 1), (LNDMRK, 0xFFFF_FFFF)] {
            let config = EngineConfig {
                priorities: vec![PriorityOverride { class: code, subtype: None, priority }],
                ..Default::default()
            };
            assert!(matches!(
                DrawPriorities::from_config(&config),
                Err(ConfigError::Invalid(_))
            ));
        }
    }
}
