use std::io::Read;

use serde::Deserialize;

use super::domain::{EmployeeIdentity, EmployeeRecord};

/// Reads roster rows exported from the operations spreadsheet. Column names
/// are the spreadsheet's own headers; unknown extra columns are ignored and
/// missing optional ones default to empty.
pub fn parse_records<R: Read>(reader: R) -> Result<Vec<EmployeeRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for row in csv_reader.deserialize::<RosterRow>() {
        records.push(row?.into_record());
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "CIDADE", default)]
    city: String,
    #[serde(rename = "NOME", default)]
    name: String,
    #[serde(rename = "FUNÇÃO", default)]
    role: String,
    #[serde(rename = "DATA DE ADMISSÃO", default)]
    admission_date: String,
    #[serde(rename = "TEMPO DE CASA", default)]
    tenure_bucket: String,
    #[serde(rename = "OBSERVAÇÃO", default)]
    observation: String,
    #[serde(rename = "VALOR MENSAL META", default)]
    monthly_target: String,
    #[serde(rename = "ERROS TOTAL", default)]
    total_errors: String,
    #[serde(rename = "ERROS GG", default)]
    severe_errors: String,
}

impl RosterRow {
    fn into_record(self) -> EmployeeRecord {
        EmployeeRecord {
            identity: EmployeeIdentity {
                city: self.city,
                name: self.name,
                role: self.role,
                admission_date: self.admission_date,
                tenure_bucket: self.tenure_bucket,
            },
            observation: self.observation,
            monthly_target: amount(&self.monthly_target),
            total_error_rate: rate(&self.total_errors),
            severe_error_rate: rate(&self.severe_errors),
        }
    }
}

/// Safe numeric coercion: empty or unparsable cells become `None`, and
/// NaN/infinite readings are discarded rather than propagated.
fn amount(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

fn rate(raw: &str) -> f64 {
    amount(raw).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str =
        "CIDADE,NOME,FUNÇÃO,DATA DE ADMISSÃO,TEMPO DE CASA,OBSERVAÇÃO,VALOR MENSAL META,ERROS TOTAL,ERROS GG\n";

    #[test]
    fn parses_a_complete_row() {
        let csv = format!(
            "{HEADER}SÃO LUÍS,MARIA DAS DORES,VISTORIADOR,2021-03-15,3 a 4 anos,,600,3.2,1.1\n"
        );
        let records = parse_records(Cursor::new(csv)).expect("parses");

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.identity.city, "SÃO LUÍS");
        assert_eq!(record.identity.role, "VISTORIADOR");
        assert_eq!(record.monthly_target, Some(600.0));
        assert_eq!(record.total_error_rate, 3.2);
        assert_eq!(record.severe_error_rate, 1.1);
    }

    #[test]
    fn malformed_numbers_coerce_instead_of_failing() {
        let csv = format!(
            "{HEADER}TIMON,JOSÉ,AUXILIAR,2022-01-10,2 a 3 anos,aguardando,n/d,abc,NaN\n"
        );
        let records = parse_records(Cursor::new(csv)).expect("parses");

        let record = &records[0];
        assert_eq!(record.monthly_target, None);
        assert_eq!(record.total_error_rate, 0.0);
        assert_eq!(record.severe_error_rate, 0.0);
        assert_eq!(record.observation, "aguardando");
    }

    #[test]
    fn fields_are_trimmed() {
        let csv = format!(
            "{HEADER}  CAROLINA ,  PEDRO LIMA , SUPERVISOR ,2020-07-01,4 a 5 anos, , 450 ,,\n"
        );
        let records = parse_records(Cursor::new(csv)).expect("parses");

        let record = &records[0];
        assert_eq!(record.identity.city, "CAROLINA");
        assert_eq!(record.identity.name, "PEDRO LIMA");
        assert_eq!(record.monthly_target, Some(450.0));
    }

    #[test]
    fn missing_headers_default_to_empty() {
        let csv = "CIDADE,NOME,FUNÇÃO,VALOR MENSAL META\nTIMON,RITA,AUXILIAR,450\n";
        let records = parse_records(Cursor::new(csv)).expect("parses");

        let record = &records[0];
        assert_eq!(record.identity.admission_date, "");
        assert_eq!(record.identity.tenure_bucket, "");
        assert_eq!(record.monthly_target, Some(450.0));
    }
}
