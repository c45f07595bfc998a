//! User-facing preferences, stored inside the encrypted database

use crate::database::InventoryDatabase;
use crate::error::{ConfigError, DatabaseError};
use crate::models::{Item, NewItem};
use serde::{Deserialize, Serialize};

pub const SETTINGS_KEY: &str = "inventory.settings";

/// Replaces supplier details when `hide_sensitive_data` is on.
pub const MASK: &str = "********";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default supplier details offered for new items.
    pub supplier_name: String,
    pub supplier_email: String,
    pub supplier_phone: String,
    pub enable_default_fields: bool,
    pub hide_sensitive_data: bool,
    pub disable_sharing: bool,
}

impl Settings {
    /// Set one field by name. Flags take `true` or `false`; text fields take
    /// `raw` verbatim.
    pub fn set_field(&mut self, field: &str, raw: &str) -> Result<(), ConfigError> {
        let mut value = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::Invalid(format!("settings: {e}")))?;
        let slot = value
            .as_object_mut()
            .and_then(|map| map.get_mut(field))
            .ok_or_else(|| ConfigError::Invalid(format!("unknown setting '{field}'")))?;
        *slot = if slot.is_boolean() {
            let flag: bool = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("setting '{field}' expects true or false"))
            })?;
            serde_json::Value::Bool(flag)
        } else {
            serde_json::Value::String(raw.to_string())
        };
        *self = serde_json::from_value(value)
            .map_err(|e| ConfigError::Invalid(format!("setting '{field}': {e}")))?;
        Ok(())
    }

    /// Fill blank supplier fields from the stored defaults, if enabled.
    /// Values already on the item win.
    pub fn apply_defaults(&self, mut item: NewItem) -> NewItem {
        if !self.enable_default_fields {
            return item;
        }
        fill_blank(&mut item.supplier_name, &self.supplier_name);
        fill_blank(&mut item.supplier_email, &self.supplier_email);
        fill_blank(&mut item.supplier_phone, &self.supplier_phone);
        item
    }

    /// Item as it should be displayed, with supplier details masked when
    /// `hide_sensitive_data` is on.
    pub fn present(&self, mut item: Item) -> Item {
        if self.hide_sensitive_data {
            for field in [
                &mut item.supplier_name,
                &mut item.supplier_email,
                &mut item.supplier_phone,
            ] {
                if !field.is_empty() {
                    *field = MASK.to_string();
                }
            }
        }
        item
    }

    pub fn sharing_allowed(&self) -> bool {
        !self.disable_sharing
    }
}

fn fill_blank(target: &mut String, default: &str) {
    if target.trim().is_empty() {
        *target = default.to_string();
    }
}

pub fn load_settings(db: &InventoryDatabase) -> Result<Settings, DatabaseError> {
    if let Some(json) = db.get_value(SETTINGS_KEY)? {
        Ok(serde_json::from_str(&json)?)
    } else {
        Ok(Settings::default())
    }
}

pub fn save_settings(db: &InventoryDatabase, settings: &Settings) -> Result<(), DatabaseError> {
    let json = serde_json::to_string(settings)?;
    db.set_value(SETTINGS_KEY, &json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::CipherKey;
    use crate::config::DatabaseConfig;
    use tempfile::tempdir;

    fn open_db(dir: &std::path::Path) -> InventoryDatabase {
        let key = CipherKey::from_encoded_private_key(b"settings-test").unwrap();
        InventoryDatabase::open(&dir.join("db"), &key, &DatabaseConfig::default()).unwrap()
    }

    fn acme() -> Settings {
        Settings {
            supplier_name: "Acme".into(),
            supplier_email: "sales@acme.test".into(),
            supplier_phone: "555-0100".into(),
            enable_default_fields: true,
            hide_sensitive_data: true,
            disable_sharing: true,
        }
    }

    #[test]
    fn defaults_are_blank_and_off() {
        let settings = Settings::default();
        assert_eq!(settings.supplier_name, "");
        assert_eq!(settings.supplier_email, "");
        assert_eq!(settings.supplier_phone, "");
        assert!(!settings.enable_default_fields);
        assert!(!settings.hide_sensitive_data);
        assert!(!settings.disable_sharing);
        assert!(settings.sharing_allowed());
    }

    #[test]
    fn defaults_when_absent() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        assert_eq!(load_settings(&db).unwrap(), Settings::default());
    }

    #[test]
    fn all_fields_survive_save_and_load() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        save_settings(&db, &acme()).unwrap();
        assert_eq!(load_settings(&db).unwrap(), acme());
    }

    #[test]
    fn stored_record_uses_field_names() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        let mut keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "disable_sharing",
                "enable_default_fields",
                "hide_sensitive_data",
                "supplier_email",
                "supplier_name",
                "supplier_phone",
            ]
        );
    }

    #[test]
    fn partial_record_fills_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{"supplier_name":"Acme"}"#).unwrap();
        assert_eq!(settings.supplier_name, "Acme");
        assert!(!settings.enable_default_fields);
    }

    #[test]
    fn set_field_covers_every_setting() {
        let mut settings = Settings::default();
        settings.set_field("supplier_name", "Acme").unwrap();
        settings.set_field("supplier_email", "sales@acme.test").unwrap();
        settings.set_field("supplier_phone", "555-0100").unwrap();
        settings.set_field("enable_default_fields", "true").unwrap();
        settings.set_field("hide_sensitive_data", "true").unwrap();
        settings.set_field("disable_sharing", "true").unwrap();
        assert_eq!(settings, acme());
    }

    #[test]
    fn text_fields_take_values_verbatim() {
        let mut settings = Settings::default();
        settings.set_field("supplier_phone", "5550100").unwrap();
        settings.set_field("supplier_name", "true").unwrap();
        assert_eq!(settings.supplier_phone, "5550100");
        assert_eq!(settings.supplier_name, "true");
    }

    #[test]
    fn set_field_rejects_unknown_and_mistyped() {
        let mut settings = Settings::default();
        assert!(settings.set_field("currency", "EUR").is_err());
        assert!(settings.set_field("hide_sensitive_data", "maybe").is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn defaults_fill_only_blank_supplier_fields() {
        let item = NewItem::new("Bolt", 0.25, 100).with_supplier("Other", "", "");
        let filled = acme().apply_defaults(item);
        assert_eq!(filled.supplier_name, "Other");
        assert_eq!(filled.supplier_email, "sales@acme.test");
        assert_eq!(filled.supplier_phone, "555-0100");
    }

    #[test]
    fn defaults_ignored_when_disabled() {
        let mut settings = acme();
        settings.enable_default_fields = false;
        let filled = settings.apply_defaults(NewItem::new("Bolt", 0.25, 100));
        assert_eq!(filled.supplier_name, "");
    }

    #[test]
    fn present_masks_supplier_details_when_hidden() {
        let item = Item {
            id: 1,
            name: "Bolt".into(),
            price: 0.25,
            quantity: 100,
            supplier_name: "Acme".into(),
            supplier_email: "sales@acme.test".into(),
            supplier_phone: String::new(),
        };
        let shown = acme().present(item.clone());
        assert_eq!(shown.name, "Bolt");
        assert_eq!(shown.supplier_name, MASK);
        assert_eq!(shown.supplier_email, MASK);
        assert_eq!(shown.supplier_phone, "");

        assert_eq!(Settings::default().present(item.clone()), item);
    }
}
