use crate::model::{Language, Pack, Sentence};
use crate::storage::DbStats;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &DbStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Languages", &stats.languages.to_string());
    builder.add_row("Packs", &stats.packs.to_string());
    builder.add_row("Sentences", &stats.sentences.to_string());
    builder.add_row("With audio", &stats.sentences_with_audio.to_string());
    builder.build()
}

#[derive(Tabled)]
struct LanguageRow<'a> {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Code")]
    code: &'a str,
    #[tabled(rename = "Name")]
    name: &'a str,
}

pub fn language_table(languages: &[Language]) -> String {
    let rows = languages.iter().map(|l| LanguageRow {
        id: l.id,
        code: &l.code,
        name: &l.name,
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct PackRow<'a> {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Language")]
    language: &'a str,
    #[tabled(rename = "Pack")]
    name: &'a str,
}

pub fn pack_table(packs: &[Pack]) -> String {
    let rows = packs.iter().map(|p| PackRow {
        id: p.id,
        language: &p.language_code,
        name: &p.name,
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct SentenceRow<'a> {
    #[tabled(rename = "#")]
    order: u32,
    #[tabled(rename = "Sentence")]
    text: &'a str,
    #[tabled(rename = "Translation")]
    translation: &'a str,
    #[tabled(rename = "Audio")]
    audio: &'a str,
}

pub fn sentence_table(sentences: &[Sentence]) -> String {
    let rows = sentences.iter().map(|s| SentenceRow {
        order: s.order_index + 1,
        text: &s.text,
        translation: s.translation.as_deref().unwrap_or(""),
        audio: if s.audio_path.is_some() { "yes" } else { "" },
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder_renders_nothing() {
        assert_eq!(TableBuilder::new().build(), "");
    }

    #[test]
    fn test_stats_table_lists_counts() {
        let stats = DbStats {
            languages: 2,
            packs: 3,
            sentences: 40,
            sentences_with_audio: 38,
        };
        let table = stats_table(&stats);
        assert!(table.contains("Languages"));
        assert!(table.contains("38"));
    }

    #[test]
    fn test_sentence_table_is_one_based() {
        let sentence = Sentence {
            id: 1,
            language_id: 1,
            pack_id: 1,
            order_index: 0,
            manifest_index: 1,
            text: "Hello".to_string(),
            translation: Some("Hola".to_string()),
            ipa: None,
            romanization: None,
            audio_path: None,
        };
        let table = sentence_table(&[sentence]);
        assert!(table.contains("Hola"));
        assert!(table.contains("│ 1 "));
    }
}
