//! Табличные данные транзакций (CSV)

use std::fmt::Write as _;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::error::{PipelineError, Result};

/// Значения, которые считаются пропусками
const MISSING_TOKENS: [&str; 6] = ["", "NA", "N/A", "NaN", "nan", "null"];

/// Пробелы вокруг значения не учитываются
pub fn is_missing(value: &str) -> bool {
    MISSING_TOKENS.contains(&value.trim())
}

/// Разбор числа без окружающих пробелов; само поле не изменяется
pub fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

/// Таблица: заголовок и строки в исходном строковом виде.
/// Числа разбираются по требованию, поэтому неизмененные столбцы
/// записываются обратно байт в байт.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl Table {
    pub fn new(headers: Vec<String>, records: Vec<StringRecord>) -> Self {
        Self { headers, records }
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { headers, records })
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_to(file)
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        wtr.write_record(&self.headers)?;
        for record in &self.records {
            wtr.write_record(record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[StringRecord] {
        &self.records
    }

    pub fn n_rows(&self) -> usize {
        self.records.len()
    }

    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    /// Столбец числовой, если каждое непустое значение разбирается как число
    /// и хотя бы одно значение присутствует
    pub fn is_numeric(&self, idx: usize) -> bool {
        let mut seen = false;
        for record in &self.records {
            let value = record.get(idx).unwrap_or("");
            if is_missing(value) {
                continue;
            }
            if parse_number(value).is_none() {
                return false;
            }
            seen = true;
        }
        seen
    }

    /// Значения столбца как f64; пропуск или нечисловое значение - ошибка
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.require_column(name)?;
        self.numeric_values(idx)
    }

    pub fn numeric_values(&self, idx: usize) -> Result<Vec<f64>> {
        let column = &self.headers[idx];
        self.records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let value = record.get(idx).unwrap_or("");
                if is_missing(value) {
                    return Err(PipelineError::MissingValue {
                        column: column.clone(),
                        row,
                    });
                }
                parse_number(value).ok_or_else(|| PipelineError::NonNumericColumn {
                    column: column.clone(),
                    row,
                    value: value.to_string(),
                })
            })
            .collect()
    }

    /// Количество пропусков по каждому столбцу
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let count = self
                    .records
                    .iter()
                    .filter(|r| is_missing(r.get(idx).unwrap_or("")))
                    .count();
                (name.clone(), count)
            })
            .collect()
    }

    /// Новая таблица без указанных столбцов (отсутствующие игнорируются)
    pub fn drop_columns(&self, names: &[&str]) -> Table {
        let keep: Vec<usize> = (0..self.n_cols())
            .filter(|&i| !names.contains(&self.headers[i].as_str()))
            .collect();

        let headers = keep.iter().map(|&i| self.headers[i].clone()).collect();
        let records = self
            .records
            .iter()
            .map(|r| keep.iter().map(|&i| r.get(i).unwrap_or("")).collect())
            .collect();

        Table { headers, records }
    }

    /// Добавляет столбец в конец или перезаписывает существующий с тем же именем
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.n_rows() {
            return Err(PipelineError::ColumnLength {
                column: name.to_string(),
                expected: self.n_rows(),
                found: values.len(),
            });
        }

        match self.column_index(name) {
            Some(idx) => {
                for (record, value) in self.records.iter_mut().zip(values) {
                    let updated: StringRecord = record
                        .iter()
                        .enumerate()
                        .map(|(i, f)| if i == idx { value.as_str() } else { f })
                        .collect();
                    *record = updated;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (record, value) in self.records.iter_mut().zip(values) {
                    record.push_field(&value);
                }
            }
        }

        Ok(())
    }

    pub fn head(&self, n: usize) -> Table {
        Table {
            headers: self.headers.clone(),
            records: self.records.iter().take(n).cloned().collect(),
        }
    }

    /// Строки с заданными индексами, в порядке индексов
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            headers: self.headers.clone(),
            records: indices
                .iter()
                .filter_map(|&i| self.records.get(i).cloned())
                .collect(),
        }
    }

    /// Текстовое представление первых строк для вывода в консоль
    pub fn render_text(&self, max_rows: usize) -> String {
        let shown: Vec<&StringRecord> = self.records.iter().take(max_rows).collect();

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for record in &shown {
            for (i, field) in record.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(field.len());
                }
            }
        }

        let mut out = String::new();
        for (header, width) in self.headers.iter().zip(&widths) {
            let _ = write!(out, "{:>width$} ", header, width = width);
        }
        out.push('\n');
        for record in shown {
            for (field, width) in record.iter().zip(&widths) {
                let _ = write!(out, "{:>width$} ", field, width = width);
            }
            out.push('\n');
        }
        if self.n_rows() > max_rows {
            let _ = writeln!(out, "... {} more rows", self.n_rows() - max_rows);
        }
        out
    }
}
