use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::session::SessionError;

/// One student as returned by the backend roster sheet. Immutable for the
/// lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    #[serde(rename = "ID_Aluno")]
    pub id: String,
    #[serde(rename = "Nome_Completo")]
    pub display_name: String,
}

/// Per-period attendance status. Wire strings match the backend
/// spreadsheet's column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PeriodStatus {
    #[default]
    #[serde(rename = "Presente")]
    Present,
    #[serde(rename = "Falta")]
    Absent,
    #[serde(rename = "Falta Justificada")]
    JustifiedAbsence,
    #[serde(rename = "Asterisco")]
    Asterisk,
    #[serde(rename = "Dispensa")]
    Exempt,
}

/// The status buttons currently selected for the three daily periods.
/// An unset period resolves to `Present`; that defaulting used to live in
/// the UI layer (pre-selected buttons) and is a data-model policy here.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodMarks {
    pub period1: Option<PeriodStatus>,
    pub period2: Option<PeriodStatus>,
    pub period3: Option<PeriodStatus>,
}

impl PeriodMarks {
    pub fn resolve(&self) -> (PeriodStatus, PeriodStatus, PeriodStatus) {
        (
            self.period1.unwrap_or_default(),
            self.period2.unwrap_or_default(),
            self.period3.unwrap_or_default(),
        )
    }
}

/// One row of the batch submission, keyed by (date, teacher, subject,
/// class, student). Field names follow the backend sheet headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(rename = "Data")]
    pub date: String,
    #[serde(rename = "ID_Professor")]
    pub teacher_id: String,
    #[serde(rename = "ID_Disciplina")]
    pub subject_id: String,
    #[serde(rename = "ID_Turma")]
    pub class_id: String,
    #[serde(rename = "ID_Aluno")]
    pub student_id: String,
    #[serde(rename = "Periodo_1")]
    pub period1: PeriodStatus,
    #[serde(rename = "Periodo_2")]
    pub period2: PeriodStatus,
    #[serde(rename = "Periodo_3")]
    pub period3: PeriodStatus,
    #[serde(rename = "Observacao")]
    pub note: String,
}

/// Selection-form output that opens a session. All fields required;
/// `date` must be a real calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub teacher_id: String,
    pub class_id: String,
    pub subject_id: String,
    pub date: String,
}

impl SessionParams {
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.teacher_id.trim().is_empty() {
            return Err(SessionError::InvalidParams("professorId"));
        }
        if self.class_id.trim().is_empty() {
            return Err(SessionError::InvalidParams("turmaId"));
        }
        if self.subject_id.trim().is_empty() {
            return Err(SessionError::InvalidParams("disciplinaId"));
        }
        if NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").is_err() {
            return Err(SessionError::InvalidParams("data"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SessionParams {
        SessionParams {
            teacher_id: "P1".into(),
            class_id: "T1".into(),
            subject_id: "D1".into(),
            date: "2025-03-10".into(),
        }
    }

    #[test]
    fn period_status_wire_strings() {
        assert_eq!(
            serde_json::to_value(PeriodStatus::JustifiedAbsence).unwrap(),
            serde_json::json!("Falta Justificada")
        );
        let parsed: PeriodStatus = serde_json::from_value(serde_json::json!("Dispensa")).unwrap();
        assert_eq!(parsed, PeriodStatus::Exempt);
    }

    #[test]
    fn unset_periods_default_to_present() {
        let marks = PeriodMarks {
            period2: Some(PeriodStatus::Absent),
            ..Default::default()
        };
        assert_eq!(
            marks.resolve(),
            (
                PeriodStatus::Present,
                PeriodStatus::Absent,
                PeriodStatus::Present
            )
        );
    }

    #[test]
    fn record_serializes_sheet_headers() {
        let record = AttendanceRecord {
            date: "2025-03-10".into(),
            teacher_id: "P1".into(),
            subject_id: "D1".into(),
            class_id: "T1".into(),
            student_id: "A1".into(),
            period1: PeriodStatus::Present,
            period2: PeriodStatus::Absent,
            period3: PeriodStatus::Present,
            note: "chegou atrasado".into(),
        };
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["ID_Aluno"], "A1");
        assert_eq!(v["Periodo_2"], "Falta");
        assert_eq!(v["Observacao"], "chegou atrasado");
    }

    #[test]
    fn params_reject_blank_fields_and_bad_dates() {
        assert!(params().validate().is_ok());

        let mut p = params();
        p.class_id = "  ".into();
        assert!(matches!(
            p.validate(),
            Err(SessionError::InvalidParams("turmaId"))
        ));

        let mut p = params();
        p.date = "2025-02-30".into();
        assert!(matches!(
            p.validate(),
            Err(SessionError::InvalidParams("data"))
        ));
    }
}
