use std::collections::HashMap;

/// One validated row of the rules file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRule {
    /// 1-based line on which the row starts
    pub line: usize,
    pub code: u16,
    pub from: String,
    pub to: String,
    /// Parent chain, joined with the configured split sequence
    pub parents: String,
    /// Free text for humans; never read by the builder
    pub comments: String,
}

/// Problems that make the whole file unusable.
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("No header row")]
    MissingHeader,
    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("Unterminated quoted field starting on line {0}")]
    UnterminatedQuote(usize),
}

/// Why a single row was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("expected at most {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("invalid code '{0}'")]
    InvalidCode(String),
    #[error("missing value for '{0}'")]
    EmptyField(&'static str),
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// 1-based line on which the row starts
    pub line: usize,
    pub error: RowError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRules {
    pub rules: Vec<RedirectRule>,
    pub rejected: Vec<RejectedRow>,
}

pub fn parse_redirect_csv(text: &str) -> Result<ParsedRules, CsvError> {
    let mut records = read_records(text)?.into_iter();
    let header = records.next().ok_or(CsvError::MissingHeader)?;
    let columns = Columns::from_header(&header.fields)?;

    let mut parsed = ParsedRules::default();
    for record in records {
        match columns.rule_from(record.line, &record.fields) {
            Ok(rule) => parsed.rules.push(rule),
            Err(error) => parsed.rejected.push(RejectedRow {
                line: record.line,
                error,
            }),
        }
    }

    Ok(parsed)
}

// =============================================================================
// Columns
// =============================================================================

struct Columns {
    width: usize,
    code: usize,
    from: usize,
    to: usize,
    parents: Option<usize>,
    comments: Option<usize>,
}

impl Columns {
    fn from_header(fields: &[String]) -> Result<Self, CsvError> {
        let positions: HashMap<String, usize> = fields
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
            .collect();

        let required = |name: &'static str| positions.get(name).copied().ok_or(CsvError::MissingColumn(name));

        Ok(Self {
            width: fields.len(),
            code: required("code")?,
            from: required("from")?,
            to: required("to")?,
            parents: positions.get("parents").copied(),
            comments: positions.get("comments").copied(),
        })
    }

    fn rule_from(&self, line: usize, fields: &[String]) -> Result<RedirectRule, RowError> {
        if fields.len() > self.width {
            return Err(RowError::FieldCount {
                expected: self.width,
                found: fields.len(),
            });
        }

        let cell = |index: usize| fields.get(index).map(|s| s.trim()).unwrap_or("");
        let optional = |index: Option<usize>| index.map(cell).unwrap_or("").to_string();

        let code = parse_code(cell(self.code))?;
        let from = non_empty(cell(self.from), "from")?;
        let to = non_empty(cell(self.to), "to")?;

        Ok(RedirectRule {
            line,
            code,
            from,
            to,
            parents: optional(self.parents),
            comments: optional(self.comments),
        })
    }
}

fn parse_code(raw: &str) -> Result<u16, RowError> {
    if raw.is_empty() {
        return Err(RowError::EmptyField("code"));
    }
    match raw.parse::<u16>() {
        Ok(code) if code > 0 => Ok(code),
        _ => Err(RowError::InvalidCode(raw.to_string())),
    }
}

fn non_empty(raw: &str, name: &'static str) -> Result<String, RowError> {
    if raw.is_empty() {
        Err(RowError::EmptyField(name))
    } else {
        Ok(raw.to_string())
    }
}

// =============================================================================
// Records
// =============================================================================

struct Record {
    line: usize,
    fields: Vec<String>,
}

/// Split CSV text into records: comma separated, `"` quoting with `""` as an
/// escaped quote, LF or CRLF line endings. Quoted fields may span lines, and
/// spaces before the opening quote are dropped.
fn read_records(text: &str) -> Result<Vec<Record>, CsvError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut record_line = 1usize;
    let mut quote_line = 1usize;

    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push('\n');
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
                quote_line = line;
            }
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_record(&mut records, record_line, std::mem::take(&mut fields));
                line += 1;
                record_line = line;
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(CsvError::UnterminatedQuote(quote_line));
    }

    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        push_record(&mut records, record_line, fields);
    }

    Ok(records)
}

fn push_record(records: &mut Vec<Record>, line: usize, fields: Vec<String>) {
    // blank line
    if fields.len() == 1 && fields[0].trim().is_empty() {
        return;
    }
    records.push(Record { line, fields });
}
