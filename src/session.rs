use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiError, BatchSink, RosterProvider};
use crate::model::{AttendanceRecord, PeriodMarks, SessionParams, Student};
use crate::queue::OfflineQueue;

pub const SAVE_AND_NEXT: &str = "Salvar e Próximo";
pub const SAVE_AND_FINISH: &str = "Salvar e Concluir";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Loading,
    Active,
    Finishing,
    Completed,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("parametro de chamada ausente ou invalido: {0}")]
    InvalidParams(&'static str),
    #[error("nenhum aluno encontrado para esta turma")]
    EmptyRoster,
    #[error("nenhuma chamada para salvar")]
    NothingToSubmit,
    #[error("ja estamos no primeiro aluno")]
    AtFirstStudent,
    #[error("operacao invalida no estado {0:?}")]
    InvalidPhase(Phase),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl SessionError {
    /// Stable code for the IPC error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::InvalidParams(_) => "bad_params",
            SessionError::EmptyRoster => "empty_roster",
            SessionError::NothingToSubmit => "nothing_to_submit",
            SessionError::AtFirstStudent => "at_first_student",
            SessionError::InvalidPhase(_) => "invalid_state",
            SessionError::Api(ApiError::Server(_)) => "server_error",
            SessionError::Api(ApiError::Transport(_)) => "transport_error",
            SessionError::Storage(_) => "storage_failed",
        }
    }
}

/// Lifecycle notifications for the presentation layer. Subscribed
/// explicitly; there is no ambient event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SessionStarted { total: usize },
    StudentChanged { index: usize },
    SessionFinished { queued: bool },
}

pub type EventListener = Box<dyn Fn(&SessionEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    /// The batch was acknowledged by the backend.
    Submitted { count: usize },
    /// Submission failed; the batch is parked in the offline queue and
    /// will be retried on reconnect. The caller still reports success.
    Queued { count: usize },
}

/// Read model the presentation layer renders from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub phase: Phase,
    pub student: Option<Student>,
    /// 1-based position of the current student, for the "3 / 25" counter.
    pub position: usize,
    pub total: usize,
    pub progress: f64,
    pub at_first: bool,
    pub at_last: bool,
    pub save_label: &'static str,
    pub records_count: usize,
}

/// Walks a roster one student at a time, buffering one record per save
/// and submitting them as a single batch at the end.
pub struct AttendanceSession {
    params: SessionParams,
    phase: Phase,
    roster: Vec<Student>,
    cursor: usize,
    records: Vec<AttendanceRecord>,
    listeners: Vec<EventListener>,
}

impl AttendanceSession {
    /// Validates the selection-form parameters. No roster is fetched yet.
    pub fn new(params: SessionParams) -> Result<Self, SessionError> {
        params.validate()?;
        Ok(Self {
            params,
            phase: Phase::Idle,
            roster: Vec::new(),
            cursor: 0,
            records: Vec::new(),
            listeners: Vec::new(),
        })
    }

    pub fn subscribe(&mut self, listener: EventListener) {
        self.listeners.push(listener);
    }

    fn emit(&self, event: SessionEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    /// Fetches the roster and activates the session. An empty roster
    /// cancels the session (the caller should go back to selection); a
    /// fetch failure leaves it `Idle` so the caller may retry.
    pub fn load_roster(&mut self, source: &dyn RosterProvider) -> Result<(), SessionError> {
        if self.phase != Phase::Idle {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        self.phase = Phase::Loading;
        let roster = match source.roster(&self.params.class_id) {
            Ok(r) => r,
            Err(e) => {
                self.phase = Phase::Idle;
                return Err(e.into());
            }
        };
        if roster.is_empty() {
            self.phase = Phase::Cancelled;
            return Err(SessionError::EmptyRoster);
        }
        info!(
            turma = %self.params.class_id,
            alunos = roster.len(),
            "chamada iniciada"
        );
        self.roster = roster;
        self.cursor = 0;
        self.phase = Phase::Active;
        self.emit(SessionEvent::SessionStarted {
            total: self.roster.len(),
        });
        self.emit(SessionEvent::StudentChanged { index: 0 });
        Ok(())
    }

    pub fn current_student(&self) -> Option<&Student> {
        match self.phase {
            Phase::Active | Phase::Finishing => self.roster.get(self.cursor),
            _ => None,
        }
    }

    /// `cursor / total`. At the first student this reads 0.0 and it never
    /// reaches 1.0 mid-session; an approximate indicator only.
    pub fn progress_fraction(&self) -> f64 {
        if self.roster.is_empty() {
            return 0.0;
        }
        self.cursor as f64 / self.roster.len() as f64
    }

    /// Label for the save affordance; flips only on the last student.
    pub fn save_button_label(&self) -> &'static str {
        if !self.roster.is_empty() && self.cursor == self.roster.len() - 1 {
            SAVE_AND_FINISH
        } else {
            SAVE_AND_NEXT
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase,
            student: self.current_student().cloned(),
            position: (self.cursor + 1).min(self.roster.len()),
            total: self.roster.len(),
            progress: self.progress_fraction(),
            at_first: self.cursor == 0,
            at_last: !self.roster.is_empty() && self.cursor == self.roster.len() - 1,
            save_label: self.save_button_label(),
            records_count: self.records.len(),
        }
    }

    fn capture_current(&mut self, marks: PeriodMarks, note: &str) {
        // Unreachable while Active/Finishing per the cursor invariant.
        let Some(student) = self.roster.get(self.cursor) else {
            return;
        };
        let (period1, period2, period3) = marks.resolve();
        self.records.push(AttendanceRecord {
            date: self.params.date.clone(),
            teacher_id: self.params.teacher_id.clone(),
            subject_id: self.params.subject_id.clone(),
            class_id: self.params.class_id.clone(),
            student_id: student.id.clone(),
            period1,
            period2,
            period3,
            note: note.trim().to_string(),
        });
    }

    /// Appends a record for the current student and steps forward. On the
    /// last student the session moves to `Finishing` instead of stepping.
    /// Records are append-only: revisiting a student adds a second record
    /// and the later one wins when the backend reads the batch.
    pub fn record_and_advance(
        &mut self,
        marks: PeriodMarks,
        note: &str,
    ) -> Result<Phase, SessionError> {
        if self.phase != Phase::Active {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        self.capture_current(marks, note);
        if self.cursor + 1 < self.roster.len() {
            self.cursor += 1;
            self.emit(SessionEvent::StudentChanged { index: self.cursor });
        } else {
            self.phase = Phase::Finishing;
        }
        Ok(self.phase)
    }

    /// Steps back one student. Does not retract the record already
    /// captured for the student being left.
    pub fn go_back(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Active | Phase::Finishing => {}
            other => return Err(SessionError::InvalidPhase(other)),
        }
        if self.cursor == 0 {
            return Err(SessionError::AtFirstStudent);
        }
        self.cursor -= 1;
        self.phase = Phase::Active;
        self.emit(SessionEvent::StudentChanged { index: self.cursor });
        Ok(())
    }

    /// Discards all in-memory state. No network call.
    pub fn cancel(&mut self) {
        self.phase = Phase::Cancelled;
        self.roster.clear();
        self.records.clear();
        self.cursor = 0;
    }

    /// Closes the session and submits everything captured as one batch.
    /// The student under the cursor is force-captured from `marks` first
    /// if no record exists for them yet. A failed submission parks the
    /// batch in the offline queue and the session still completes; the
    /// records are not lost, delivery is merely deferred.
    pub fn finish(
        &mut self,
        marks: PeriodMarks,
        note: &str,
        sink: &dyn BatchSink,
        queue: &OfflineQueue<'_>,
    ) -> Result<FinishOutcome, SessionError> {
        match self.phase {
            Phase::Active | Phase::Finishing => {}
            other => return Err(SessionError::InvalidPhase(other)),
        }
        self.phase = Phase::Finishing;

        let current_recorded = self
            .current_student()
            .map(|s| self.records.iter().any(|r| r.student_id == s.id))
            .unwrap_or(true);
        if !current_recorded {
            self.capture_current(marks, note);
        }

        if self.records.is_empty() {
            return Err(SessionError::NothingToSubmit);
        }

        let count = self.records.len();
        let queued = match sink.submit(&self.records) {
            Ok(()) => false,
            Err(e) => {
                warn!(error = %e, "envio em lote falhou, lote vai para a fila offline");
                queue.enqueue(&self.records)?;
                true
            }
        };

        self.phase = Phase::Completed;
        self.roster.clear();
        self.records.clear();
        self.cursor = 0;
        self.emit(SessionEvent::SessionFinished { queued });
        info!(registros = count, queued, "chamada concluida");

        Ok(if queued {
            FinishOutcome::Queued { count }
        } else {
            FinishOutcome::Submitted { count }
        })
    }
}
