use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use tracing::info;

use crate::competitor::{Competitor, CompetitorId, Hand};
use crate::error::RosterError;

pub const ROSTER_HEADER: [&str; 4] = ["Name", "Surname", "Age", "Hand"];
pub const MIN_AGE: i64 = 1;
pub const MAX_AGE: i64 = 150;

/// Roster entry as typed by an operator or read from a file, before
/// validation.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCompetitor {
    pub name: String,
    pub surname: String,
    pub age: i64,
    pub hand: String,
}

struct ValidFields {
    name: String,
    surname: String,
    age: u8,
    hand: Hand,
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

fn validate(entry: &NewCompetitor) -> Result<ValidFields, String> {
    let name = entry.name.trim();
    let surname = entry.surname.trim();
    if name.is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    if surname.is_empty() {
        return Err("Surname cannot be empty".to_string());
    }
    if !(MIN_AGE..=MAX_AGE).contains(&entry.age) {
        return Err(format!(
            "Age must be a number between {MIN_AGE} and {MAX_AGE}, got: {}",
            entry.age
        ));
    }
    let hand = entry.hand.parse::<Hand>()?;
    Ok(ValidFields {
        name: capitalize(name),
        surname: capitalize(surname),
        age: entry.age as u8,
        hand,
    })
}

fn parse_record(record: &csv::StringRecord) -> Result<NewCompetitor, String> {
    if record.len() != ROSTER_HEADER.len() {
        return Err(format!(
            "Expected 4 fields (Name,Surname,Age,Hand), got {}",
            record.len()
        ));
    }
    let age_raw = &record[2];
    let age = age_raw
        .parse::<i64>()
        .map_err(|_| format!("Age must be a number between {MIN_AGE} and {MAX_AGE}, got: {age_raw}"))?;
    Ok(NewCompetitor {
        name: record[0].to_string(),
        surname: record[1].to_string(),
        age,
        hand: record[3].to_string(),
    })
}

fn is_header(record: &csv::StringRecord) -> bool {
    record.len() == ROSTER_HEADER.len()
        && record
            .iter()
            .zip(ROSTER_HEADER)
            .all(|(field, header)| field.eq_ignore_ascii_case(header))
}

/// The pre-tournament competitor list. Ids come from a counter that only
/// moves forward, so a removed competitor's id is never handed out again.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    competitors: Vec<Competitor>,
    next_id: CompetitorId,
}

impl Default for Roster {
    fn default() -> Self {
        Roster {
            competitors: Vec::new(),
            next_id: 1,
        }
    }
}

impl Roster {
    pub fn new() -> Self {
        Roster::default()
    }

    pub fn competitors(&self) -> &[Competitor] {
        &self.competitors
    }

    pub fn len(&self) -> usize {
        self.competitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.competitors.is_empty()
    }

    pub fn get(&self, id: CompetitorId) -> Option<&Competitor> {
        self.competitors.iter().find(|c| c.id == id)
    }

    pub fn add(&mut self, entry: NewCompetitor) -> Result<CompetitorId, RosterError> {
        let fields = validate(&entry).map_err(RosterError::InvalidField)?;
        Ok(self.push(fields))
    }

    pub fn update(&mut self, id: CompetitorId, entry: NewCompetitor) -> Result<(), RosterError> {
        let fields = validate(&entry).map_err(RosterError::InvalidField)?;
        let competitor = self
            .competitors
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RosterError::UnknownCompetitor(id))?;
        competitor.name = fields.name;
        competitor.surname = fields.surname;
        competitor.age = fields.age;
        competitor.hand = fields.hand;
        Ok(())
    }

    pub fn remove(&mut self, id: CompetitorId) -> Result<Competitor, RosterError> {
        let idx = self
            .competitors
            .iter()
            .position(|c| c.id == id)
            .ok_or(RosterError::UnknownCompetitor(id))?;
        Ok(self.competitors.remove(idx))
    }

    /// Append every record of a `Name,Surname,Age,Hand` file. A header line
    /// and blank lines are skipped. The first bad record aborts the import
    /// and nothing is added.
    pub fn import_csv<R: io::Read>(&mut self, reader: R) -> Result<usize, RosterError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut parsed = Vec::new();
        for result in reader.records() {
            let record = result?;
            if record.iter().all(str::is_empty) || is_header(&record) {
                continue;
            }
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let fields = parse_record(&record)
                .and_then(|entry| validate(&entry))
                .map_err(|reason| RosterError::Line { line, reason })?;
            parsed.push(fields);
        }

        let count = parsed.len();
        for fields in parsed {
            self.push(fields);
        }
        Ok(count)
    }

    pub fn export_csv<W: io::Write>(&self, writer: W) -> Result<(), RosterError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(ROSTER_HEADER)?;
        for c in &self.competitors {
            let age = c.age.to_string();
            writer.write_record([c.name.as_str(), c.surname.as_str(), age.as_str(), c.hand.as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load_csv(&mut self, path: &Path) -> Result<usize, RosterError> {
        let file = fs::File::open(path)?;
        let count = self.import_csv(file)?;
        info!(path = %path.display(), count, "roster imported");
        Ok(count)
    }

    pub fn save_csv(&self, path: &Path) -> Result<(), RosterError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(path)?;
        self.export_csv(file)?;
        info!(path = %path.display(), count = self.competitors.len(), "roster exported");
        Ok(())
    }

    fn push(&mut self, fields: ValidFields) -> CompetitorId {
        let id = self.next_id;
        self.next_id += 1;
        self.competitors
            .push(Competitor::new(id, fields.name, fields.surname, fields.age, fields.hand));
        id
    }
}
