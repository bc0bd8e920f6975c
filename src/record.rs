//! Record and field vocabulary for scraped school data
//!
//! Output rows are ordered maps from field display name to string value.
//! The fixed vocabulary splits into list fields (read from the listing
//! table) and detail fields (read from individual profile pages).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::normalize::SENTINEL;

/// One attribute of a school, drawn from the fixed vocabulary.
///
/// `as_str` yields the portal's Indonesian display name, which is also the
/// key used in JSON output and in caller-supplied field lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    NamaSekolah,
    Npsn,
    Status,
    Kelurahan,
    Alamat,
    KepalaSekolah,
    Telepon,
    Email,
    Website,
    Yayasan,
    SiswaLakiLaki,
    SiswaPerempuan,
}

/// Fields populated during the listing scrape.
pub const LIST_FIELDS: [Field; 4] = [
    Field::NamaSekolah,
    Field::Npsn,
    Field::Status,
    Field::Kelurahan,
];

/// Fields that require visiting a profile page.
pub const DETAIL_FIELDS: [Field; 8] = [
    Field::Alamat,
    Field::KepalaSekolah,
    Field::Telepon,
    Field::Email,
    Field::Website,
    Field::Yayasan,
    Field::SiswaLakiLaki,
    Field::SiswaPerempuan,
];

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::NamaSekolah => "Nama Sekolah",
            Field::Npsn => "NPSN",
            Field::Status => "Status",
            Field::Kelurahan => "Kelurahan",
            Field::Alamat => "Alamat",
            Field::KepalaSekolah => "Kepala Sekolah",
            Field::Telepon => "Telepon",
            Field::Email => "Email",
            Field::Website => "Website",
            Field::Yayasan => "Yayasan",
            Field::SiswaLakiLaki => "Jumlah Siswa Laki-laki",
            Field::SiswaPerempuan => "Jumlah Siswa Perempuan",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        LIST_FIELDS
            .iter()
            .chain(DETAIL_FIELDS.iter())
            .copied()
            .find(|f| f.as_str() == name.trim())
    }

    pub fn is_detail(&self) -> bool {
        DETAIL_FIELDS.contains(self)
    }
}

/// Ordered caller-chosen subset of the field vocabulary.
///
/// The order is significant: it fixes the key order of output records, and
/// the first field is the sort key for the aggregated result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet(Vec<Field>);

impl FieldSet {
    pub fn new(fields: Vec<Field>) -> Result<Self, ScrapeError> {
        if fields.is_empty() {
            return Err(ScrapeError::EmptyFieldSet);
        }
        Ok(Self(fields))
    }

    /// Parses display names, e.g. `["Nama Sekolah", "Email"]`.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, ScrapeError> {
        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            let field = Field::from_name(name.as_ref())
                .ok_or_else(|| ScrapeError::UnknownField(name.as_ref().to_string()))?;
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        Self::new(fields)
    }

    pub fn fields(&self) -> &[Field] {
        &self.0
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains(&field)
    }

    /// The sort key for the final result set.
    pub fn sort_key(&self) -> Field {
        self.0[0]
    }

    /// Whether any requested field requires the detail stage.
    pub fn needs_detail(&self) -> bool {
        self.0.iter().any(|f| f.is_detail())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One output row: an insertion-ordered field-name → value map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, String>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: Field, value: String) {
        self.0.insert(field.as_str().to_string(), value);
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(field.as_str()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merges extracted detail fields onto this record. Additive only:
    /// keys already present keep their list-stage value.
    pub fn merge_detail(&mut self, detail: Record) {
        for (key, value) in detail.0 {
            self.0.entry(key).or_insert(value);
        }
    }

    /// Rebuilds the record so it carries exactly the requested fields, in
    /// field-set order, with the sentinel standing in for anything absent.
    pub fn finalized(&self, fields: &FieldSet) -> Record {
        let mut out = Record::new();
        for &field in fields.fields() {
            let value = self
                .get(field)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(SENTINEL);
            out.set(field, value.to_string());
        }
        out
    }
}

/// Unit of work for the detail pool: the listing link plus the partial
/// record built from the listing row. Owned by one worker for its lifetime.
#[derive(Debug, Clone)]
pub struct EnrichmentTask {
    pub link: String,
    pub partial: Record,
}

impl EnrichmentTask {
    pub fn new(link: String, partial: Record) -> Self {
        Self { link, partial }
    }
}
