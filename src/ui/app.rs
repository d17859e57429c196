use std::collections::HashSet;
use std::mem;
use std::path::Path;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;
use tracing::warn;

use crate::error::SchoolError;
use crate::export::ViewRow;
use crate::models::EntityKind;
use crate::store::SchoolStore;

use super::forms::{ConfirmDelete, FileAction, FormKind, RecordForm, Submission};
use super::helpers::{centered_rect, surface_error};

/// Header space for the title and active filter.
const HEADER_HEIGHT: u16 = 3;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Rows skipped by PageUp/PageDown.
const PAGE_STEP: usize = 10;

/// Fine-grained modes layered over the records table.
enum Mode {
    Normal,
    Editing(RecordForm),
    ConfirmDelete(ConfirmDelete),
    /// Live search; holds the filter to restore on Esc.
    Searching(String),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state. The table rows are a copy of the store's view
/// rows, re-read after every action so nothing outlives a cache rebuild.
pub struct App {
    store: SchoolStore,
    rows: Vec<ViewRow>,
    filter: String,
    selected: usize,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(store: SchoolStore) -> Self {
        let mut app = Self {
            store,
            rows: Vec::new(),
            filter: String::new(),
            selected: 0,
            mode: Mode::Normal,
            status: None,
        };
        app.reload_rows();
        app
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Editing(form) => self.handle_form_key(code, form),
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm),
            Mode::Searching(previous) => self.handle_search_key(code, previous),
        };

        Ok(exit)
    }

    /// Ctrl shortcuts for the file operations. Ignored while a dialog is open.
    pub fn handle_ctrl(&mut self, code: KeyCode) -> Result<()> {
        if !matches!(self.mode, Mode::Normal) {
            return Ok(());
        }
        let action = match code {
            KeyCode::Char('e') => FileAction::ExportCsv,
            KeyCode::Char('b') => FileAction::Backup,
            KeyCode::Char('s') => FileAction::SaveJson,
            KeyCode::Char('l') => FileAction::LoadJson,
            KeyCode::Char('o') => FileAction::OpenDatabase,
            _ => return Ok(()),
        };
        self.clear_status();
        let initial = match action {
            FileAction::OpenDatabase => self.store.path().display().to_string(),
            _ => action.default_path().to_string(),
        };
        self.mode = Mode::Editing(RecordForm::file(action, &initial));
        Ok(())
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Esc if !self.filter.is_empty() => {
                self.filter.clear();
                self.reload_rows();
            }
            KeyCode::Char('q') | KeyCode::Esc => *exit = true,
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-(PAGE_STEP as isize)),
            KeyCode::PageDown => self.move_selection(PAGE_STEP as isize),
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = self.rows.len().saturating_sub(1),
            KeyCode::Char('/') => {
                self.clear_status();
                return Ok(Mode::Searching(self.filter.clone()));
            }
            KeyCode::Char('s') => return Ok(Mode::Editing(RecordForm::new_student())),
            KeyCode::Char('i') => return Ok(Mode::Editing(RecordForm::new_instructor())),
            KeyCode::Char('c') => return Ok(Mode::Editing(RecordForm::new_course())),
            KeyCode::Char('e') | KeyCode::Enter => return Ok(self.edit_selected()),
            KeyCode::Char('d') | KeyCode::Delete => return Ok(self.confirm_selected()),
            KeyCode::Char('r') => return Ok(self.register_form()),
            KeyCode::Char('a') => return Ok(self.assign_form()),
            KeyCode::Char('g') => self.reload_from_database(),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_form_key(&mut self, code: KeyCode, mut form: RecordForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Enter => return self.submit(form),
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(ch) => {
                form.push_char(ch);
            }
            _ => {}
        }
        form.error = None;
        Mode::Editing(form)
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Mode {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let result = match confirm.kind {
                    EntityKind::Student => self.store.delete_student(&confirm.id),
                    EntityKind::Instructor => self.store.delete_instructor(&confirm.id),
                    EntityKind::Course => self.store.delete_course(&confirm.id),
                };
                match result {
                    Ok(()) => {
                        self.reload_rows();
                        self.set_status(
                            format!("Deleted {} {}.", confirm.kind, confirm.id),
                            StatusKind::Info,
                        );
                    }
                    Err(err) => self.report(&err),
                }
                Mode::Normal
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Mode::Normal,
            _ => Mode::ConfirmDelete(confirm),
        }
    }

    fn handle_search_key(&mut self, code: KeyCode, previous: String) -> Mode {
        match code {
            KeyCode::Esc => {
                self.filter = previous;
                self.reload_rows();
                return Mode::Normal;
            }
            KeyCode::Enter => {
                let found = self.rows.len();
                self.set_status(format!("{found} matching records."), StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Backspace => {
                self.filter.pop();
            }
            KeyCode::Char(ch) if !ch.is_control() => self.filter.push(ch),
            _ => return Mode::Searching(previous),
        }
        self.selected = 0;
        self.reload_rows();
        Mode::Searching(previous)
    }

    fn submit(&mut self, mut form: RecordForm) -> Mode {
        let outcome = form
            .submission()
            .and_then(|submission| self.apply(form.editing.as_deref(), submission));
        match outcome {
            Ok(message) => {
                self.reload_rows();
                self.set_status(message, StatusKind::Info);
                Mode::Normal
            }
            Err(err) => {
                form.error = Some(surface_error(&err));
                Mode::Editing(form)
            }
        }
    }

    /// Push a validated submission through the store.
    fn apply(&mut self, editing: Option<&str>, submission: Submission) -> Result<String, SchoolError> {
        let message = match (submission, editing) {
            (Submission::Student(student), Some(old_id)) => {
                self.store.update_student(old_id, &student)?;
                format!("Updated student {}.", student.student_id)
            }
            (Submission::Student(student), None) => {
                self.store.add_student(&student)?;
                format!("Added student {}.", student.student_id)
            }
            (Submission::Instructor(instructor), Some(old_id)) => {
                self.store.update_instructor(old_id, &instructor)?;
                format!("Updated instructor {}.", instructor.instructor_id)
            }
            (Submission::Instructor(instructor), None) => {
                self.store.add_instructor(&instructor)?;
                format!("Added instructor {}.", instructor.instructor_id)
            }
            (Submission::Course(course), Some(old_id)) => {
                self.store.update_course(old_id, &course)?;
                format!("Updated course {}.", course.course_id)
            }
            (Submission::Course(course), None) => {
                self.store.add_course(&course)?;
                format!("Added course {}.", course.course_id)
            }
            (Submission::Register { student_id, course_id }, _) => {
                self.store.register_student_in_course(&student_id, &course_id)?;
                format!("Registered {student_id} in {course_id}.")
            }
            (Submission::Assign { instructor_id, course_id }, _) => {
                self.store.assign_instructor_to_course(&instructor_id, &course_id)?;
                format!("Assigned {instructor_id} to {course_id}.")
            }
            (Submission::File(action, path), _) => match action {
                FileAction::ExportCsv => {
                    let rows = self.store.export_csv(&path)?;
                    format!("Exported {rows} records to {}.", path.display())
                }
                FileAction::Backup => {
                    self.store.backup(&path)?;
                    format!("Database copied to {}.", path.display())
                }
                FileAction::SaveJson => {
                    self.store.save_json(&path)?;
                    format!("Saved JSON to {}.", path.display())
                }
                FileAction::LoadJson => {
                    self.store.load_json(&path)?;
                    format!("Loaded {} into the database.", path.display())
                }
                FileAction::OpenDatabase => {
                    self.open_database(&path)?;
                    format!("Opened database {}.", path.display())
                }
            },
        };
        Ok(message)
    }

    /// Swap the live store for one at `path`. The current store is only
    /// closed once the new one has opened.
    fn open_database(&mut self, path: &Path) -> Result<(), SchoolError> {
        let opened = SchoolStore::open(path)?;
        let previous = mem::replace(&mut self.store, opened);
        if let Err(err) = previous.close() {
            warn!(error = %err, "failed to close previous database");
        }
        self.filter.clear();
        self.selected = 0;
        Ok(())
    }

    fn reload_from_database(&mut self) {
        match self.store.refresh_cache() {
            Ok(()) => {
                self.reload_rows();
                self.set_status("Reloaded from database.", StatusKind::Info);
            }
            Err(err) => self.report(&err),
        }
    }

    fn edit_selected(&mut self) -> Mode {
        let Some(row) = self.current_row().cloned() else {
            self.set_status("No record selected.", StatusKind::Error);
            return Mode::Normal;
        };
        let graph = self.store.graph();
        let form = match row.kind {
            EntityKind::Student => graph.student(&row.id).map(RecordForm::edit_student),
            EntityKind::Instructor => graph.instructor(&row.id).map(RecordForm::edit_instructor),
            EntityKind::Course => graph.course(&row.id).map(RecordForm::edit_course),
        };
        match form {
            Some(form) => Mode::Editing(form),
            None => {
                self.set_status(format!("{} {} no longer exists.", row.kind, row.id), StatusKind::Error);
                Mode::Normal
            }
        }
    }

    fn confirm_selected(&mut self) -> Mode {
        match self.current_row() {
            Some(row) => Mode::ConfirmDelete(ConfirmDelete {
                kind: row.kind,
                id: row.id.clone(),
                name: row.name.clone(),
            }),
            None => {
                self.set_status("No record selected.", StatusKind::Error);
                Mode::Normal
            }
        }
    }

    /// Pre-fill whichever side of the registration the selection provides.
    fn register_form(&self) -> Mode {
        let mut form = match self.current_row() {
            Some(row) if row.kind == EntityKind::Student => RecordForm::register(&row.id, ""),
            Some(row) if row.kind == EntityKind::Course => RecordForm::register("", &row.id),
            _ => RecordForm::register("", ""),
        };
        if form.fields[0].value.is_empty() {
            form.active = 0;
        } else {
            form.active = 1;
        }
        Mode::Editing(form)
    }

    fn assign_form(&self) -> Mode {
        let mut form = match self.current_row() {
            Some(row) if row.kind == EntityKind::Instructor => RecordForm::assign(&row.id, ""),
            Some(row) if row.kind == EntityKind::Course => RecordForm::assign("", &row.id),
            _ => RecordForm::assign("", ""),
        };
        if form.fields[0].value.is_empty() {
            form.active = 0;
        } else {
            form.active = 1;
        }
        Mode::Editing(form)
    }

    fn current_row(&self) -> Option<&ViewRow> {
        self.rows.get(self.selected)
    }

    fn move_selection(&mut self, delta: isize) {
        if self.rows.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.rows.len() - 1;
        let next = self.selected as isize + delta;
        self.selected = next.clamp(0, last as isize) as usize;
    }

    /// Re-read the table from the store, applying the current filter.
    fn reload_rows(&mut self) {
        let matches: Option<HashSet<(EntityKind, String)>> = if self.filter.is_empty() {
            None
        } else {
            let found = self.store.search(&self.filter);
            Some(
                found
                    .students
                    .iter()
                    .map(|s| (EntityKind::Student, s.student_id.clone()))
                    .chain(
                        found
                            .instructors
                            .iter()
                            .map(|i| (EntityKind::Instructor, i.instructor_id.clone())),
                    )
                    .chain(
                        found
                            .courses
                            .iter()
                            .map(|c| (EntityKind::Course, c.course_id.clone())),
                    )
                    .collect(),
            )
        };

        self.rows = self
            .store
            .view_rows()
            .filter(|row| match &matches {
                Some(keys) => keys.contains(&(row.kind, row.id.clone())),
                None => true,
            })
            .collect();

        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    fn report(&mut self, err: &SchoolError) {
        self.set_status(surface_error(err), StatusKind::Error);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        self.draw_table(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::Editing(form) => self.draw_form(frame, area, form),
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::Searching(_) => self.draw_search_bar(frame, area),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let (students, instructors, courses) = self.store.graph().counts();
        let block = Block::default().borders(Borders::ALL).title("School Records");
        let mut spans = vec![Span::raw(format!(
            "{students} students • {instructors} instructors • {courses} courses"
        ))];
        if !self.filter.is_empty() {
            spans.push(Span::styled(
                format!("   filter: \"{}\"", self.filter),
                Style::default().fg(Color::Yellow),
            ));
        }
        let paragraph = Paragraph::new(Line::from(spans)).block(block);
        frame.render_widget(paragraph, area);
    }

    fn draw_table(&self, frame: &mut Frame, area: Rect) {
        if self.rows.is_empty() {
            let text = if self.filter.is_empty() {
                "No records yet. Press 's', 'i' or 'c' to add one.".to_string()
            } else {
                format!("No records match \"{}\".", self.filter)
            };
            let message = Paragraph::new(text)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(message, area);
            return;
        }

        let header = Row::new(["Type", "ID", "Name", "Age", "Email", "Courses / Instructor"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let rows = self.rows.iter().map(|row| {
            Row::new(vec![
                Cell::from(row.kind.to_string()),
                Cell::from(row.id.clone()),
                Cell::from(row.name.clone()),
                Cell::from(row.age.map(|age| age.to_string()).unwrap_or_default()),
                Cell::from(row.email.clone().unwrap_or_default()),
                Cell::from(row.related.clone()),
            ])
        });
        let widths = [
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Min(16),
            Constraint::Length(4),
            Constraint::Min(20),
            Constraint::Min(16),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL))
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");

        let mut state = TableState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let pairs: &[(&str, &str)] = match &self.mode {
            Mode::Editing(_) => &[("[Tab]", " Next field   "), ("[Enter]", " Save   "), ("[Esc]", " Cancel")],
            Mode::ConfirmDelete(_) => &[("[Y]", " Delete   "), ("[N/Esc]", " Keep")],
            Mode::Searching(_) => &[("[Enter]", " Keep filter   "), ("[Esc]", " Restore")],
            Mode::Normal => &[
                ("[s/i/c]", " Add   "),
                ("[e]", " Edit   "),
                ("[d]", " Delete   "),
                ("[r]", " Register   "),
                ("[a]", " Assign   "),
                ("[/]", " Search   "),
                ("[^E/^B/^S/^L/^O]", " CSV/Backup/Save/Load/Open   "),
                ("[q]", " Quit"),
            ],
        };
        let spans = pairs
            .iter()
            .flat_map(|(key, label)| {
                [
                    Span::styled(key.to_string(), key_style),
                    Span::raw(label.to_string()),
                ]
            })
            .collect::<Vec<_>>();
        Line::from(spans)
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title("Search");
        let paragraph = Paragraph::new(Span::raw(format!("Search: {}", self.filter)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Search: ".len() as u16 + self.filter.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect, form: &RecordForm) {
        let percent_y = if matches!(form.kind, FormKind::File(_)) { 30 } else { 45 };
        let popup_area = centered_rect(60, percent_y, area);
        frame.render_widget(Clear, popup_area);

        let title = form.title();
        let block = Block::default().title(title.as_str()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = form.build_lines();
        lines.push(Line::from(""));
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch field • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let cursor_x = inner.x + form.cursor_offset() as u16;
        let cursor_y = inner.y + form.active as u16;
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Confirm Delete").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!(
                "Delete {} {} ({})?",
                confirm.kind, confirm.id, confirm.name
            )),
            Line::from(confirm.consequence()),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Student;
    use tempfile::TempDir;

    fn app_with_student(tmp: &TempDir) -> App {
        let mut store = SchoolStore::open(tmp.path().join("first.sqlite")).unwrap();
        store
            .add_student(&Student::new("Ann", 20, "ann@x.com", "S1").unwrap())
            .unwrap();
        App::new(store)
    }

    fn set_path(app: &mut App, path: &Path) {
        match &mut app.mode {
            Mode::Editing(form) => form.fields[0].value = path.display().to_string(),
            _ => panic!("expected the path form to be open"),
        }
    }

    #[test]
    fn ctrl_o_switches_to_another_database() {
        let tmp = TempDir::new().unwrap();
        let mut app = app_with_student(&tmp);
        assert_eq!(app.rows.len(), 1);

        app.handle_ctrl(KeyCode::Char('o')).unwrap();
        if let Mode::Editing(form) = &app.mode {
            assert_eq!(form.fields[0].value, app.store.path().display().to_string());
        }
        let second = tmp.path().join("second.sqlite");
        set_path(&mut app, &second);
        assert!(!app.handle_key(KeyCode::Enter).unwrap());

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.store.path(), second.as_path());
        assert!(app.rows.is_empty());
    }

    #[test]
    fn failed_open_keeps_current_database() {
        let tmp = TempDir::new().unwrap();
        let mut app = app_with_student(&tmp);
        let first = app.store.path().to_path_buf();

        app.handle_ctrl(KeyCode::Char('o')).unwrap();
        // The parent of this path is a regular file.
        set_path(&mut app, &first.join("nested.sqlite"));
        assert!(!app.handle_key(KeyCode::Enter).unwrap());

        match &app.mode {
            Mode::Editing(form) => assert!(form.error.is_some()),
            _ => panic!("form should stay open with an error"),
        }
        assert_eq!(app.store.path(), first.as_path());
        assert_eq!(app.rows.len(), 1);
    }

    #[test]
    fn failed_reload_is_reported_in_footer() {
        let tmp = TempDir::new().unwrap();
        let mut app = app_with_student(&tmp);
        let conn = rusqlite::Connection::open(app.store.path()).unwrap();
        conn.execute("UPDATE students SET email = 'broken' WHERE student_id = 'S1'", [])
            .unwrap();

        assert!(!app.handle_key(KeyCode::Char('g')).unwrap());
        assert!(matches!(
            app.status,
            Some(StatusMessage {
                kind: StatusKind::Error,
                ..
            })
        ));
        assert_eq!(app.rows.len(), 1);
    }
}
