use std::fs;
use std::path::Path;

use quicklabel::{AnnotationService, FileStore, ImageStatus, ServiceOptions};

fn options() -> ServiceOptions {
    ServiceOptions {
        auto_save_interval: 0,
        ..ServiceOptions::default()
    }
}

#[test]
fn labeling_state_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = Path::new("/images/a.jpg");
    let b = Path::new("/images/b.jpg");
    let c = Path::new("/images/c.jpg");

    {
        let mut svc = AnnotationService::open(FileStore::in_dir(dir.path()), options())
            .expect("open fresh store");
        svc.annotate("cats", a, 1).expect("annotate a");
        svc.annotate("cats", b, 0).expect("annotate b");
        svc.skip("cats", c).expect("skip c");
        svc.annotate("dogs", a, 0).expect("annotate dogs a");
        svc.set_current_index("cats", 2);
        svc.save_all().expect("save");
    }

    let svc = AnnotationService::open(FileStore::in_dir(dir.path()), options())
        .expect("reopen store");
    assert_eq!(svc.get_image_status("cats", a), ImageStatus::Labeled(1));
    assert_eq!(svc.get_image_status("cats", b), ImageStatus::Labeled(0));
    assert_eq!(svc.get_image_status("cats", c), ImageStatus::Skipped);
    assert_eq!(svc.get_image_status("dogs", a), ImageStatus::Labeled(0));
    assert_eq!(svc.get_current_index("cats"), 2);
    assert_eq!(svc.get_current_index("dogs"), 0);

    // History is not persisted
    assert!(!svc.can_undo());

    let progress = svc.get_progress("cats", 10);
    assert_eq!(progress.annotated_count, 2);
    assert_eq!(progress.skipped_count, 1);
}

#[test]
fn auto_save_writes_without_explicit_save() {
    let dir = tempfile::tempdir().expect("tempdir");
    let options = ServiceOptions {
        auto_save_interval: 2,
        ..ServiceOptions::default()
    };

    let mut svc =
        AnnotationService::open(FileStore::in_dir(dir.path()), options.clone()).expect("open");
    svc.annotate("cats", Path::new("/x/1.jpg"), 1).expect("annotate");
    svc.annotate("cats", Path::new("/x/2.jpg"), 1).expect("annotate");
    drop(svc);

    let reopened = AnnotationService::open(FileStore::in_dir(dir.path()), options).expect("reopen");
    assert_eq!(reopened.records("cats").count(), 2);
}

#[test]
fn corrupt_lines_are_skipped_on_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::in_dir(dir.path());
    fs::create_dir_all(store.annotations_path().parent().expect("parent")).expect("mkdir");
    fs::write(
        store.annotations_path(),
        concat!(
            r#"{"image_path":"/x/1.jpg","label":1,"dataset_type":"cats","timestamp":"2024-05-01T10:00:00Z"}"#,
            "\n",
            "{ this is not json\n",
            r#"{"image_path":"/x/2.jpg","label":0,"dataset_type":"cats","timestamp":"2024-05-01T10:00:01Z"}"#,
            "\n",
        ),
    )
    .expect("write log");

    let svc = AnnotationService::open(store, options()).expect("open");
    assert_eq!(svc.get_label("cats", Path::new("/x/1.jpg")), Some(1));
    assert_eq!(svc.get_label("cats", Path::new("/x/2.jpg")), Some(0));
}

#[test]
fn corrupt_session_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::in_dir(dir.path());
    fs::create_dir_all(store.session_path().parent().expect("parent")).expect("mkdir");
    fs::write(store.session_path(), "{ broken").expect("write session");

    let svc = AnnotationService::open(store, options()).expect("open");
    assert_eq!(svc.get_current_index("cats"), 0);
}
