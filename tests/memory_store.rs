use school_records::{
    Course, EntityKind, Instructor, MemoryStore, SchoolError, Snapshot, Student,
};
use tempfile::TempDir;

fn populated() -> MemoryStore {
    let mut store = MemoryStore::new();
    store
        .add_student(Student::new("Ann", 20, "ann@x.com", "S1").unwrap())
        .unwrap();
    store
        .add_student(Student::new("Ben", 22, "ben@x.com", "S2").unwrap())
        .unwrap();
    store
        .add_instructor(Instructor::new("Dr. Cole", 51, "cole@x.com", "I1").unwrap())
        .unwrap();
    store.add_course(Course::new("C1", "Algebra", None)).unwrap();
    store.add_course(Course::new("C2", "Biology", None)).unwrap();
    store.register_student_in_course("S1", "C1").unwrap();
    store.register_student_in_course("S2", "C1").unwrap();
    store.assign_instructor_to_course("I1", "C2").unwrap();
    store
}

#[test]
fn registration_updates_both_sides() {
    let store = populated();
    let graph = store.graph();
    assert_eq!(graph.student("S1").unwrap().registered_courses, vec!["C1"]);
    assert_eq!(graph.course("C1").unwrap().enrolled_students, vec!["S1", "S2"]);
    assert_eq!(graph.instructor("I1").unwrap().assigned_courses, vec!["C2"]);
    assert_eq!(graph.course("C2").unwrap().instructor_id.as_deref(), Some("I1"));
}

#[test]
fn repeated_registration_keeps_single_entry() {
    let mut store = populated();
    store.register_student_in_course("S1", "C1").unwrap();
    assert_eq!(store.graph().student("S1").unwrap().registered_courses, vec!["C1"]);
    assert_eq!(store.graph().course("C1").unwrap().enrolled_students.len(), 2);
}

#[test]
fn unknown_references_are_rejected() {
    let mut store = populated();
    assert!(matches!(
        store.register_student_in_course("S9", "C1"),
        Err(SchoolError::Referential(_))
    ));
    assert!(matches!(
        store.assign_instructor_to_course("I9", "C1"),
        Err(SchoolError::Referential(_))
    ));
    assert!(matches!(
        store.add_course(Course::new("C3", "Chem", Some("I9".into()))),
        Err(SchoolError::Referential(_))
    ));
    assert!(store.graph().course("C3").is_none());
}

#[test]
fn duplicates_are_rejected() {
    let mut store = populated();
    let err = store
        .add_instructor(Instructor::new("Other", 40, "o@x.com", "I1").unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        SchoolError::DuplicateKey { kind: EntityKind::Instructor, .. }
    ));
    assert_eq!(store.graph().instructor("I1").unwrap().person.name, "Dr. Cole");
}

#[test]
fn deletes_clean_up_relationships() {
    let mut store = populated();
    store.delete_student("S1").unwrap();
    assert_eq!(store.graph().course("C1").unwrap().enrolled_students, vec!["S2"]);

    store.delete_instructor("I1").unwrap();
    assert_eq!(store.graph().course("C2").unwrap().instructor_id, None);

    store.delete_course("C1").unwrap();
    assert!(store.graph().student("S2").unwrap().registered_courses.is_empty());

    assert!(matches!(
        store.delete_course("C1"),
        Err(SchoolError::NotFound { kind: EntityKind::Course, .. })
    ));
}

#[test]
fn rename_rewrites_references() {
    let mut store = populated();
    store
        .update_student("S1", Student::new("Ann", 20, "ann@x.com", "S10").unwrap())
        .unwrap();
    store
        .update_course("C2", Course::new("BIO-1", "Biology", Some("I1".into())))
        .unwrap();

    let graph = store.graph();
    assert_eq!(graph.course("C1").unwrap().enrolled_students, vec!["S10", "S2"]);
    assert_eq!(graph.instructor("I1").unwrap().assigned_courses, vec!["BIO-1"]);
    assert!(graph.course("C2").is_none());
}

#[test]
fn search_is_case_insensitive() {
    let store = populated();
    assert_eq!(store.search("").total(), 5);
    let found = store.search("ALG");
    assert_eq!(found.courses.len(), 1);
    assert!(found.students.is_empty());
    assert_eq!(store.search("ann").students[0].student_id, "S1");
}

#[test]
fn json_file_round_trip() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("school.json");
    let store = populated();
    store.save_json(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\n  \"students\": ["));

    let loaded = MemoryStore::load_json(&path).unwrap();
    assert_eq!(loaded.to_snapshot(), store.to_snapshot());
}

#[test]
fn snapshot_relationships_are_merged() {
    let json = r#"{
      "students": [
        {"name": "Ann", "age": 20, "email": "ann@x.com", "student_id": "S1",
         "registered_course_ids": ["C1", "C404"]}
      ],
      "instructors": [
        {"name": "Cole", "age": 50, "email": "cole@x.com", "instructor_id": "I1",
         "assigned_course_ids": ["C2"]}
      ],
      "courses": [
        {"course_id": "C1", "course_name": "Algebra", "instructor_id": null,
         "enrolled_student_ids": []},
        {"course_id": "C2", "course_name": "Biology", "instructor_id": null,
         "enrolled_student_ids": ["S1"]}
      ]
    }"#;
    let snapshot: Snapshot = serde_json::from_str(json).unwrap();
    let store = MemoryStore::from_snapshot(&snapshot).unwrap();
    let graph = store.graph();

    // Course-side enrollments are merged first, then the student's own list.
    assert_eq!(graph.student("S1").unwrap().registered_courses, vec!["C2", "C1"]);
    assert_eq!(graph.course("C1").unwrap().enrolled_students, vec!["S1"]);
    assert_eq!(graph.course("C2").unwrap().instructor_id.as_deref(), Some("I1"));
}

#[test]
fn snapshot_with_invalid_age_is_refused() {
    let json = r#"{
      "students": [
        {"name": "Ann", "age": -1, "email": "ann@x.com", "student_id": "S1",
         "registered_course_ids": []}
      ],
      "instructors": [],
      "courses": []
    }"#;
    let snapshot: Snapshot = serde_json::from_str(json).unwrap();
    assert!(matches!(
        MemoryStore::from_snapshot(&snapshot),
        Err(SchoolError::Validation(_))
    ));
}
