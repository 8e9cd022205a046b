use serde::{Deserialize, Serialize};

// ──────────────────── Schedule Types ────────────────────

/// A persisted one-shot announcement definition.
///
/// Serialized with camelCase field names so the store file stays readable
/// by (and compatible with) older deployments of the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    /// Unique ID, the creation instant's millisecond timestamp as a string.
    pub id: String,
    /// Fire time, `HH:MM` 24-hour, local to the configured timezone.
    pub time: String,
    /// Destination channel ID (opaque platform identifier).
    pub channel_id: String,
    /// Role to mention (opaque platform identifier).
    pub role_id: String,
    /// Resolved boss display title, or the raw key if the catalog missed.
    #[serde(default)]
    pub boss: Option<String>,
    /// Fully rendered message body.
    pub message: String,
    /// Image URL from the catalog, if any.
    #[serde(default)]
    pub image: Option<String>,
}

impl ScheduleRecord {
    /// The `<@&id>` mention string for this record's role.
    pub fn role_mention(&self) -> String {
        format!("<@&{}>", self.role_id)
    }
}

// ──────────────────── Catalog Types ────────────────────

/// A boss catalog row, normalized for lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Lower-cased lookup name.
    pub key: String,
    /// Display title.
    #[serde(default)]
    pub titulo: Option<String>,
    /// Image URL.
    #[serde(default)]
    pub imagem: Option<String>,
    /// Optional external ID.
    #[serde(default)]
    pub id: Option<String>,
}

impl CatalogEntry {
    /// Title to show in messages: the display title, falling back to the key.
    pub fn display_title(&self) -> &str {
        self.titulo.as_deref().unwrap_or(&self.key)
    }
}

// ──────────────────── Delivery Types ────────────────────

/// Ready-to-send announcement, handed from the engine to the notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Destination channel ID.
    pub channel_id: String,
    /// Pre-rendered role mention (`<@&id>`), or empty for none.
    pub role_mention: String,
    /// Message body.
    pub body: String,
    /// Optional image URL; rendered as an embed when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_record_serde_camel_case() {
        let record = ScheduleRecord {
            id: "1700000000000".into(),
            time: "18:30".into(),
            channel_id: "111".into(),
            role_id: "222".into(),
            boss: Some("Ancient Dragon".into()),
            message: "spawn soon".into(),
            image: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"channelId\":\"111\""));
        assert!(json.contains("\"roleId\":\"222\""));
        let parsed: ScheduleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "1700000000000");
        assert_eq!(parsed.time, "18:30");
    }

    #[test]
    fn test_schedule_record_reads_legacy_file_shape() {
        // Shape produced by the original bot's schedules.json.
        let json = r#"{
            "id": "1690000000000",
            "time": "07:45",
            "channelId": "123",
            "roleId": "456",
            "boss": null,
            "message": "bring potions",
            "image": null
        }"#;
        let parsed: ScheduleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.channel_id, "123");
        assert!(parsed.boss.is_none());
        assert!(parsed.image.is_none());
    }

    #[test]
    fn test_role_mention() {
        let record = ScheduleRecord {
            id: "1".into(),
            time: "00:00".into(),
            channel_id: "c".into(),
            role_id: "987654".into(),
            boss: None,
            message: String::new(),
            image: None,
        };
        assert_eq!(record.role_mention(), "<@&987654>");
    }

    #[test]
    fn test_catalog_entry_display_title_fallback() {
        let entry = CatalogEntry {
            key: "dragon".into(),
            titulo: None,
            imagem: None,
            id: None,
        };
        assert_eq!(entry.display_title(), "dragon");

        let entry = CatalogEntry {
            titulo: Some("Ancient Dragon".into()),
            ..entry
        };
        assert_eq!(entry.display_title(), "Ancient Dragon");
    }

    #[test]
    fn test_notification_serde() {
        let n = Notification {
            channel_id: "111".into(),
            role_mention: "<@&222>".into(),
            body: "boss incoming".into(),
            image: Some("http://x/d.png".into()),
        };
        let json = serde_json::to_string(&n).unwrap();
        let parsed: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.image.as_deref(), Some("http://x/d.png"));
    }
}
