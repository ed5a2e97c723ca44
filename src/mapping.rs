//! Cross-source identity mapping.
//!
//! The three upstream systems identify the same physical unit differently:
//! the queue system uses display names ("Ouro Verde"), the reception system
//! numeric ids ("2"), and the digital channel its own group ids. The
//! [`IdentityMapper`] resolves between these namespaces from static tables
//! supplied at startup. A lookup miss is an explicit `None` - callers
//! render "no data" rather than attributing stats to the wrong unit.

use std::collections::BTreeMap;

/// Static correspondence tables between unit identifier namespaces.
#[derive(Debug, Clone, Default)]
pub struct IdentityMapper {
    unit_to_reception: BTreeMap<String, String>,
    reception_to_unit: BTreeMap<String, String>,
    unit_to_digital: BTreeMap<String, String>,
    digital_to_unit: BTreeMap<String, String>,
}

impl IdentityMapper {
    /// Build a mapper from (unit, reception id) and (unit, digital group id)
    /// pairs. Reverse indexes are derived so both directions can be queried.
    pub fn new(
        reception: impl IntoIterator<Item = (String, String)>,
        digital: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut mapper = Self::default();
        for (unit, id) in reception {
            mapper.reception_to_unit.insert(id.clone(), unit.clone());
            mapper.unit_to_reception.insert(unit, id);
        }
        for (unit, id) in digital {
            mapper.digital_to_unit.insert(id.clone(), unit.clone());
            mapper.unit_to_digital.insert(unit, id);
        }
        mapper
    }

    /// Reception-side id for a queue-system unit.
    pub fn reception_id(&self, unit: &str) -> Option<&str> {
        self.unit_to_reception.get(unit).map(String::as_str)
    }

    /// Digital-channel group id for a queue-system unit.
    pub fn digital_group(&self, unit: &str) -> Option<&str> {
        self.unit_to_digital.get(unit).map(String::as_str)
    }

    /// Queue-system unit for a reception-side id.
    pub fn unit_for_reception(&self, reception_id: &str) -> Option<&str> {
        self.reception_to_unit.get(reception_id).map(String::as_str)
    }

    /// Queue-system unit for a digital-channel group id.
    pub fn unit_for_digital(&self, group_id: &str) -> Option<&str> {
        self.digital_to_unit.get(group_id).map(String::as_str)
    }
}
