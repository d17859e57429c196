use std::path::PathBuf;

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::error::Result;
use crate::models::{Course, EntityKind, Instructor, Student};
use crate::validation::{parse_age, validate, Field};

/// File operations that only need a destination or source path.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum FileAction {
    ExportCsv,
    Backup,
    SaveJson,
    LoadJson,
    OpenDatabase,
}

impl FileAction {
    pub(crate) fn title(self) -> &'static str {
        match self {
            FileAction::ExportCsv => "Export CSV",
            FileAction::Backup => "Backup Database",
            FileAction::SaveJson => "Save JSON",
            FileAction::LoadJson => "Load JSON",
            FileAction::OpenDatabase => "Open Database",
        }
    }

    pub(crate) fn default_path(self) -> &'static str {
        match self {
            FileAction::ExportCsv => "school_export.csv",
            FileAction::Backup => "school_backup.sqlite",
            FileAction::SaveJson | FileAction::LoadJson => "school.json",
            FileAction::OpenDatabase => "school.sqlite",
        }
    }
}

/// What a form produces once its inputs pass validation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum FormKind {
    Student,
    Instructor,
    Course,
    Register,
    Assign,
    File(FileAction),
}

#[derive(Clone, Debug)]
pub(crate) struct FormField {
    pub(crate) label: &'static str,
    pub(crate) value: String,
    pub(crate) optional: bool,
}

impl FormField {
    fn required(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            optional: false,
        }
    }

    fn optional(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            optional: true,
        }
    }
}

/// Validated form output, ready to hand to the store.
#[derive(Debug)]
pub(crate) enum Submission {
    Student(Student),
    Instructor(Instructor),
    Course(Course),
    Register { student_id: String, course_id: String },
    Assign { instructor_id: String, course_id: String },
    File(FileAction, PathBuf),
}

/// Generic field-list form used for every add/edit/link/file dialog.
#[derive(Clone, Debug)]
pub(crate) struct RecordForm {
    pub(crate) kind: FormKind,
    /// Identity key of the record being edited; `None` when adding.
    pub(crate) editing: Option<String>,
    pub(crate) fields: Vec<FormField>,
    pub(crate) active: usize,
    pub(crate) error: Option<String>,
}

impl RecordForm {
    fn with_fields(kind: FormKind, editing: Option<String>, fields: Vec<FormField>) -> Self {
        Self {
            kind,
            editing,
            fields,
            active: 0,
            error: None,
        }
    }

    pub(crate) fn new_student() -> Self {
        Self::with_fields(FormKind::Student, None, person_fields("Student ID", "", "", "", ""))
    }

    pub(crate) fn edit_student(student: &Student) -> Self {
        Self::with_fields(
            FormKind::Student,
            Some(student.student_id.clone()),
            person_fields(
                "Student ID",
                &student.person.name,
                &student.person.age.to_string(),
                &student.person.email,
                &student.student_id,
            ),
        )
    }

    pub(crate) fn new_instructor() -> Self {
        Self::with_fields(
            FormKind::Instructor,
            None,
            person_fields("Instructor ID", "", "", "", ""),
        )
    }

    pub(crate) fn edit_instructor(instructor: &Instructor) -> Self {
        Self::with_fields(
            FormKind::Instructor,
            Some(instructor.instructor_id.clone()),
            person_fields(
                "Instructor ID",
                &instructor.person.name,
                &instructor.person.age.to_string(),
                &instructor.person.email,
                &instructor.instructor_id,
            ),
        )
    }

    pub(crate) fn new_course() -> Self {
        Self::with_fields(FormKind::Course, None, course_fields("", "", ""))
    }

    pub(crate) fn edit_course(course: &Course) -> Self {
        Self::with_fields(
            FormKind::Course,
            Some(course.course_id.clone()),
            course_fields(
                &course.course_id,
                &course.course_name,
                course.instructor_id.as_deref().unwrap_or(""),
            ),
        )
    }

    pub(crate) fn register(student_id: &str, course_id: &str) -> Self {
        Self::with_fields(
            FormKind::Register,
            None,
            vec![
                FormField::required("Student ID", student_id),
                FormField::required("Course ID", course_id),
            ],
        )
    }

    pub(crate) fn assign(instructor_id: &str, course_id: &str) -> Self {
        Self::with_fields(
            FormKind::Assign,
            None,
            vec![
                FormField::required("Instructor ID", instructor_id),
                FormField::required("Course ID", course_id),
            ],
        )
    }

    pub(crate) fn file(action: FileAction, path: &str) -> Self {
        Self::with_fields(
            FormKind::File(action),
            None,
            vec![FormField::required("Path", path)],
        )
    }

    pub(crate) fn title(&self) -> String {
        let verb = if self.editing.is_some() { "Edit" } else { "Add" };
        match self.kind {
            FormKind::Student => format!("{verb} {}", EntityKind::Student),
            FormKind::Instructor => format!("{verb} {}", EntityKind::Instructor),
            FormKind::Course => format!("{verb} {}", EntityKind::Course),
            FormKind::Register => "Register Student in Course".to_string(),
            FormKind::Assign => "Assign Instructor to Course".to_string(),
            FormKind::File(action) => action.title().to_string(),
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = (self.active + 1) % self.fields.len();
    }

    pub(crate) fn prev_field(&mut self) {
        self.active = (self.active + self.fields.len() - 1) % self.fields.len();
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        if let Some(field) = self.fields.get_mut(self.active) {
            field.value.push(ch);
            true
        } else {
            false
        }
    }

    pub(crate) fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.active) {
            field.value.pop();
        }
    }

    fn value(&self, idx: usize) -> &str {
        self.fields
            .get(idx)
            .map(|field| field.value.trim())
            .unwrap_or("")
    }

    /// Run every field through the shared validators and build the entity or
    /// request the form stands for.
    pub(crate) fn submission(&self) -> Result<Submission> {
        match self.kind {
            FormKind::Student => {
                let (name, age, email, id) = self.person_inputs()?;
                Ok(Submission::Student(Student::new(name, age, email, id)?))
            }
            FormKind::Instructor => {
                let (name, age, email, id) = self.person_inputs()?;
                Ok(Submission::Instructor(Instructor::new(name, age, email, id)?))
            }
            FormKind::Course => {
                validate(Field::Id, self.value(0))?;
                validate(Field::Name, self.value(1))?;
                let instructor = self.value(2);
                let instructor_id = (!instructor.is_empty()).then(|| instructor.to_string());
                Ok(Submission::Course(Course::new(
                    self.value(0),
                    self.value(1),
                    instructor_id,
                )))
            }
            FormKind::Register => {
                validate(Field::Id, self.value(0))?;
                validate(Field::Id, self.value(1))?;
                Ok(Submission::Register {
                    student_id: self.value(0).to_string(),
                    course_id: self.value(1).to_string(),
                })
            }
            FormKind::Assign => {
                validate(Field::Id, self.value(0))?;
                validate(Field::Id, self.value(1))?;
                Ok(Submission::Assign {
                    instructor_id: self.value(0).to_string(),
                    course_id: self.value(1).to_string(),
                })
            }
            FormKind::File(action) => {
                validate(Field::Name, self.value(0))?;
                Ok(Submission::File(action, PathBuf::from(self.value(0))))
            }
        }
    }

    fn person_inputs(&self) -> Result<(String, i64, String, String)> {
        validate(Field::Name, self.value(0))?;
        let age = parse_age(self.value(1))?;
        validate(Field::Email, self.value(2))?;
        validate(Field::Id, self.value(3))?;
        Ok((
            self.value(0).to_string(),
            age,
            self.value(2).to_string(),
            self.value(3).to_string(),
        ))
    }

    /// Render every field as `Label: value`, highlighting the active one.
    pub(crate) fn build_lines(&self) -> Vec<Line<'static>> {
        self.fields
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let is_active = idx == self.active;
                let display = if field.value.is_empty() {
                    if field.optional {
                        "<optional>".to_string()
                    } else {
                        "<required>".to_string()
                    }
                } else {
                    field.value.clone()
                };
                let style = if is_active {
                    Style::default().fg(Color::Yellow)
                } else if field.value.is_empty() {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::raw(format!("{}: ", field.label)),
                    Span::styled(display, style),
                ])
            })
            .collect()
    }

    /// Cursor column offset within the active line.
    pub(crate) fn cursor_offset(&self) -> usize {
        self.fields
            .get(self.active)
            .map(|field| field.label.len() + 2 + field.value.chars().count())
            .unwrap_or(0)
    }
}

fn person_fields(id_label: &'static str, name: &str, age: &str, email: &str, id: &str) -> Vec<FormField> {
    vec![
        FormField::required("Name", name),
        FormField::required("Age", age),
        FormField::required("Email", email),
        FormField::required(id_label, id),
    ]
}

fn course_fields(id: &str, name: &str, instructor_id: &str) -> Vec<FormField> {
    vec![
        FormField::required("Course ID", id),
        FormField::required("Course Name", name),
        FormField::optional("Instructor ID", instructor_id),
    ]
}

/// Pending deletion awaiting a y/n answer.
#[derive(Clone, Debug)]
pub(crate) struct ConfirmDelete {
    pub(crate) kind: EntityKind,
    pub(crate) id: String,
    pub(crate) name: String,
}

impl ConfirmDelete {
    /// Describe what else disappears or changes with the record.
    pub(crate) fn consequence(&self) -> &'static str {
        match self.kind {
            EntityKind::Student => "Their course registrations are removed as well.",
            EntityKind::Instructor => "Courses they teach become unassigned.",
            EntityKind::Course => "All registrations for this course are removed.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SchoolError, ValidationError};

    fn fill(form: &mut RecordForm, values: &[&str]) {
        for (idx, value) in values.iter().enumerate() {
            form.fields[idx].value = value.to_string();
        }
    }

    #[test]
    fn student_form_builds_validated_student() {
        let mut form = RecordForm::new_student();
        fill(&mut form, &["Ann", " 20 ", "ann@x.com", "S1"]);
        match form.submission().unwrap() {
            Submission::Student(student) => {
                assert_eq!(student.student_id, "S1");
                assert_eq!(student.person.age, 20);
            }
            other => panic!("unexpected submission {other:?}"),
        }
    }

    #[test]
    fn student_form_rejects_bad_input() {
        let mut form = RecordForm::new_student();
        fill(&mut form, &["Ann", "twenty", "ann@x.com", "S1"]);
        assert!(matches!(
            form.submission(),
            Err(SchoolError::Validation(ValidationError::InvalidAge(_)))
        ));

        fill(&mut form, &["Ann", "20", "ann-at-x", "S1"]);
        assert!(matches!(
            form.submission(),
            Err(SchoolError::Validation(ValidationError::InvalidEmail(_)))
        ));

        fill(&mut form, &["Ann", "20", "ann@x.com", ""]);
        assert!(matches!(
            form.submission(),
            Err(SchoolError::Validation(ValidationError::Required("ID")))
        ));
    }

    #[test]
    fn course_form_treats_blank_instructor_as_unassigned() {
        let mut form = RecordForm::new_course();
        fill(&mut form, &["C1", "Algebra", "  "]);
        match form.submission().unwrap() {
            Submission::Course(course) => assert_eq!(course.instructor_id, None),
            other => panic!("unexpected submission {other:?}"),
        }
    }

    #[test]
    fn field_focus_wraps() {
        let mut form = RecordForm::register("S1", "C1");
        form.prev_field();
        assert_eq!(form.active, 1);
        form.next_field();
        assert_eq!(form.active, 0);
    }
}
