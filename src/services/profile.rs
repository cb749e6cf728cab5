use crate::db::Database;
use chrono::{Datelike, NaiveDate};

/// Profile fields in display order.
pub const PROFILE_FIELDS: [&str; 4] = ["name", "birthday", "country", "hobbies"];
pub const BIRTHDAY: &str = "birthday";
pub const BIRTHDAY_HINT: &str = "(dd.mm.yyyy)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    pub field: &'static str,
    pub value: Option<String>,
    pub shown: bool,
}

impl ProfileEntry {
    /// Label used for modal inputs.
    pub fn input_label(&self) -> String {
        if self.field == BIRTHDAY {
            format!("{}{}", self.field, BIRTHDAY_HINT)
        } else {
            self.field.to_string()
        }
    }
}

pub fn field_from_label(label: &str) -> Option<&'static str> {
    let name = label.trim_end_matches(BIRTHDAY_HINT);
    PROFILE_FIELDS.iter().copied().find(|f| *f == name)
}

pub struct ProfileService {
    db: Database,
}

impl ProfileService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All fields for `user_id` in display order, creating missing rows.
    pub async fn entries(&self, user_id: u64) -> anyhow::Result<Vec<ProfileEntry>> {
        let rows = self
            .db
            .run_blocking(move |db| {
                db.ensure_profile(user_id, &PROFILE_FIELDS)?;
                db.profile_rows(user_id)
            })
            .await?;

        let entries = PROFILE_FIELDS
            .iter()
            .copied()
            .filter_map(|field| {
                rows.iter().find(|r| r.info == field).map(|r| ProfileEntry {
                    field,
                    value: r.value.clone(),
                    shown: r.shown,
                })
            })
            .collect();
        Ok(entries)
    }

    pub async fn shown_entries(&self, user_id: u64) -> anyhow::Result<Vec<ProfileEntry>> {
        let mut entries = self.entries(user_id).await?;
        entries.retain(|e| e.shown);
        Ok(entries)
    }

    pub async fn set_shown(&self, user_id: u64, field: &str, shown: bool) -> anyhow::Result<()> {
        let field = known_field(field)?;
        self.db
            .run_blocking(move |db| {
                db.ensure_profile(user_id, &PROFILE_FIELDS)?;
                db.set_profile_shown(user_id, field, shown)
            })
            .await?;
        Ok(())
    }

    /// Stores submitted values; blank answers clear the field.
    pub async fn update_values(
        &self,
        user_id: u64,
        values: Vec<(&'static str, String)>,
    ) -> anyhow::Result<()> {
        self.db
            .run_blocking(move |db| {
                db.ensure_profile(user_id, &PROFILE_FIELDS)?;
                for (field, value) in &values {
                    let value = value.trim();
                    let value = (!value.is_empty()).then_some(value);
                    db.set_profile_value(user_id, field, value)?;
                }
                Ok(())
            })
            .await
    }
}

fn known_field(field: &str) -> anyhow::Result<&'static str> {
    PROFILE_FIELDS
        .iter()
        .copied()
        .find(|f| *f == field)
        .ok_or_else(|| anyhow::anyhow!("unknown profile field `{}`", field))
}

/// Parses `dd.mm.yyyy` or `dd/mm/yyyy`, separators may be mixed.
pub fn parse_birthday(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    let mut parts = input.split(['.', '/']);
    let day = parts.next()?;
    let month = parts.next()?;
    let year = parts.next()?;
    if parts.next().is_some() || day.len() != 2 || month.len() != 2 || year.len() != 4 {
        return None;
    }
    if ![day, month, year]
        .iter()
        .all(|p| p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Whole years between `birthday` and `today`.
pub fn age_on(birthday: NaiveDate, today: NaiveDate) -> i32 {
    let had_birthday = (today.month(), today.day()) >= (birthday.month(), birthday.day());
    today.year() - birthday.year() - if had_birthday { 0 } else { 1 }
}

pub fn age_from_string(input: &str, today: NaiveDate) -> Option<i32> {
    parse_birthday(input).map(|birthday| age_on(birthday, today))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service() -> ProfileService {
        let db = Database::open(":memory:").unwrap();
        db.execute_init().unwrap();
        ProfileService::new(db)
    }

    #[test]
    fn test_parse_birthday_formats() {
        assert_eq!(parse_birthday("05.03.1990"), Some(date(1990, 3, 5)));
        assert_eq!(parse_birthday("05/03/1990"), Some(date(1990, 3, 5)));
        assert_eq!(parse_birthday("05.03/1990"), Some(date(1990, 3, 5)));
        assert_eq!(parse_birthday("5.3.1990"), None);
        assert_eq!(parse_birthday("31.02.1990"), None);
        assert_eq!(parse_birthday("1990-03-05"), None);
        assert_eq!(parse_birthday("aa.bb.cccc"), None);
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let birthday = date(2000, 6, 15);
        assert_eq!(age_on(birthday, date(2024, 6, 14)), 23);
        assert_eq!(age_on(birthday, date(2024, 6, 15)), 24);
        assert_eq!(age_from_string("15.06.2000", date(2024, 12, 1)), Some(24));
        assert_eq!(age_from_string("someday", date(2024, 12, 1)), None);
    }

    #[test]
    fn test_field_labels() {
        let entry = ProfileEntry {
            field: BIRTHDAY,
            value: None,
            shown: true,
        };
        assert_eq!(entry.input_label(), "birthday(dd.mm.yyyy)");
        assert_eq!(field_from_label("birthday(dd.mm.yyyy)"), Some(BIRTHDAY));
        assert_eq!(field_from_label("hobbies"), Some("hobbies"));
        assert_eq!(field_from_label("shoe size"), None);
    }

    #[tokio::test]
    async fn test_entries_created_in_display_order() {
        let service = service();
        let entries = service.entries(1).await.unwrap();
        let fields: Vec<_> = entries.iter().map(|e| e.field).collect();
        assert_eq!(fields, PROFILE_FIELDS.to_vec());
        assert!(entries.iter().all(|e| e.shown && e.value.is_none()));
    }

    #[tokio::test]
    async fn test_toggle_and_update() {
        let service = service();
        service.set_shown(1, "country", false).await.unwrap();
        service
            .update_values(1, vec![("name", "Ada".to_string()), ("hobbies", "  ".to_string())])
            .await
            .unwrap();

        let shown = service.shown_entries(1).await.unwrap();
        let fields: Vec<_> = shown.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "birthday", "hobbies"]);
        assert_eq!(shown[0].value.as_deref(), Some("Ada"));
        assert_eq!(shown[2].value, None);

        assert!(service.set_shown(1, "shoe size", true).await.is_err());
    }
}
