use speculate2::speculate;
use studynotes::db::Database;
use studynotes::models::*;

fn create_test_note(db: &Database) -> Note {
    db.create_note(CreateNoteInput {
        title: "Test Note".to_string(),
        content: "Some test content".to_string(),
    })
    .expect("Failed to create note")
}

fn sample_quiz() -> Quiz {
    Quiz {
        question: "What is water?".to_string(),
        options: vec![
            QuizOption {
                label: "A".to_string(),
                text: "H2O".to_string(),
            },
            QuizOption {
                label: "B".to_string(),
                text: "CO2".to_string(),
            },
        ],
        answer: "A".to_string(),
        explanation: "Water is H2O.".to_string(),
    }
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "notes" {
        describe "create_note" {
            it "creates a note with title and content" {
                let note = db.create_note(CreateNoteInput {
                    title: "My Note".to_string(),
                    content: "Body".to_string(),
                }).expect("Failed to create note");

                assert_eq!(note.title, "My Note");
                assert_eq!(note.content, "Body");
                assert!(note.extracted_info.is_none());
                assert!(note.translations.is_none());
                assert!(note.quiz_question.is_none());
            }

            it "sets created_at and updated_at to the same instant" {
                let note = create_test_note(&db);
                assert_eq!(note.created_at, note.updated_at);
            }
        }

        describe "get_note" {
            it "returns None for a non-existent note" {
                let result = db.get_note(9999).expect("Query failed");
                assert!(result.is_none());
            }

            it "returns the note by id with matching fields" {
                let created = create_test_note(&db);

                let found = db.get_note(created.id).expect("Query failed").unwrap();
                assert_eq!(found.title, created.title);
                assert_eq!(found.content, created.content);
                assert_eq!(found.created_at, found.updated_at);
            }
        }

        describe "list_notes" {
            it "returns empty list when no notes exist" {
                let notes = db.list_notes().expect("Query failed");
                assert!(notes.is_empty());
            }

            it "orders by most recently updated first" {
                let first = create_test_note(&db);
                let second = create_test_note(&db);

                let notes = db.list_notes().expect("Query failed");
                assert_eq!(notes[0].id, second.id);

                db.update_note(first.id, UpdateNoteInput {
                    title: Some("Bumped".to_string()),
                    content: None,
                }).expect("Update failed");

                let notes = db.list_notes().expect("Query failed");
                assert_eq!(notes[0].id, first.id);
                assert_eq!(notes[1].id, second.id);
            }
        }

        describe "update_note" {
            it "returns None for a non-existent note" {
                let result = db.update_note(9999, UpdateNoteInput {
                    title: Some("x".to_string()),
                    content: None,
                }).expect("Update failed");
                assert!(result.is_none());
            }

            it "updates only the title when content is omitted" {
                let note = create_test_note(&db);

                let updated = db.update_note(note.id, UpdateNoteInput {
                    title: Some("New Title".to_string()),
                    content: None,
                }).expect("Update failed").unwrap();

                assert_eq!(updated.title, "New Title");
                assert_eq!(updated.content, "Some test content");
            }

            it "updates only the content when title is omitted" {
                let note = create_test_note(&db);

                let updated = db.update_note(note.id, UpdateNoteInput {
                    title: None,
                    content: Some("New content".to_string()),
                }).expect("Update failed").unwrap();

                assert_eq!(updated.title, "Test Note");
                assert_eq!(updated.content, "New content");
            }

            it "refreshes updated_at but never created_at" {
                let note = create_test_note(&db);

                let updated = db.update_note(note.id, UpdateNoteInput {
                    title: Some("T2".to_string()),
                    content: None,
                }).expect("Update failed").unwrap();

                assert_eq!(updated.created_at, note.created_at);
                assert!(updated.updated_at >= updated.created_at);
            }
        }

        describe "delete_note" {
            it "deletes the note" {
                let note = create_test_note(&db);

                assert!(db.delete_note(note.id).expect("Delete failed"));
                assert!(db.get_note(note.id).expect("Query failed").is_none());
            }

            it "returns false for a non-existent note" {
                assert!(!db.delete_note(9999).expect("Delete failed"));
            }
        }

        describe "search_notes" {
            it "returns empty list for an empty query" {
                create_test_note(&db);
                let notes = db.search_notes("").expect("Search failed");
                assert!(notes.is_empty());
            }

            it "matches a substring of the title" {
                let note = create_test_note(&db);
                let notes = db.search_notes("est No").expect("Search failed");
                assert_eq!(notes.len(), 1);
                assert_eq!(notes[0].id, note.id);
            }

            it "matches a substring of the content" {
                let note = create_test_note(&db);
                let notes = db.search_notes("test content").expect("Search failed");
                assert_eq!(notes.len(), 1);
                assert_eq!(notes[0].id, note.id);
            }

            it "returns empty list when nothing matches" {
                create_test_note(&db);
                let notes = db.search_notes("zebra").expect("Search failed");
                assert!(notes.is_empty());
            }
        }
    }

    describe "ai_writes" {
        describe "save_extracted_info" {
            it "persists the extraction and its timestamp" {
                let note = create_test_note(&db);

                assert!(db.save_extracted_info(note.id, "key points").expect("Save failed"));

                let found = db.get_note(note.id).expect("Query failed").unwrap();
                assert_eq!(found.extracted_info.as_deref(), Some("key points"));
                assert!(found.extracted_at.is_some());
                assert!(found.updated_at > note.updated_at);
            }

            it "overwrites a previous extraction" {
                let note = create_test_note(&db);
                db.save_extracted_info(note.id, "first").expect("Save failed");
                db.save_extracted_info(note.id, "second").expect("Save failed");

                let found = db.get_note(note.id).expect("Query failed").unwrap();
                assert_eq!(found.extracted_info.as_deref(), Some("second"));
            }

            it "returns false for a non-existent note" {
                assert!(!db.save_extracted_info(9999, "info").expect("Save failed"));
            }
        }

        describe "upsert_translation" {
            it "accumulates entries across languages" {
                let note = create_test_note(&db);

                assert!(db.upsert_translation(note.id, "fr", "Bonjour").expect("Upsert failed"));
                assert!(db.upsert_translation(note.id, "de", "Hallo").expect("Upsert failed"));

                let found = db.get_note(note.id).expect("Query failed").unwrap();
                let translations = found.to_response().translations;
                assert_eq!(translations.get("fr").map(String::as_str), Some("Bonjour"));
                assert_eq!(translations.get("de").map(String::as_str), Some("Hallo"));
            }

            it "replaces the entry when a language is translated again" {
                let note = create_test_note(&db);

                db.upsert_translation(note.id, "fr", "Bonjour").expect("Upsert failed");
                db.upsert_translation(note.id, "fr", "Salut").expect("Upsert failed");

                let translations = db.get_note(note.id).expect("Query failed")
                    .unwrap().to_response().translations;
                assert_eq!(translations.len(), 1);
                assert_eq!(translations.get("fr").map(String::as_str), Some("Salut"));
            }

            it "sets both translation_updated_at and updated_at" {
                let note = create_test_note(&db);

                db.upsert_translation(note.id, "fr", "Bonjour").expect("Upsert failed");

                let found = db.get_note(note.id).expect("Query failed").unwrap();
                assert!(found.translation_updated_at.is_some());
                assert!(found.updated_at > note.updated_at);
            }

            it "returns false for a non-existent note" {
                assert!(!db.upsert_translation(9999, "fr", "Bonjour").expect("Upsert failed"));
            }
        }

        describe "save_quiz" {
            it "persists the whole quiz group" {
                let note = create_test_note(&db);

                assert!(db.save_quiz(note.id, &sample_quiz()).expect("Save failed"));

                let found = db.get_note(note.id).expect("Query failed").unwrap();
                assert_eq!(found.quiz_question.as_deref(), Some("What is water?"));
                assert_eq!(found.quiz_answer.as_deref(), Some("A"));
                assert_eq!(found.quiz_explanation.as_deref(), Some("Water is H2O."));
                assert!(found.quiz_generated_at.is_some());

                let options = found.to_response().quiz_options;
                assert_eq!(options.len(), 2);
                assert_eq!(options[0].label, "A");
            }

            it "overwrites a previous quiz as one unit" {
                let note = create_test_note(&db);
                db.save_quiz(note.id, &sample_quiz()).expect("Save failed");

                let replacement = Quiz {
                    question: "What is CO2?".to_string(),
                    options: vec![QuizOption {
                        label: "A".to_string(),
                        text: "Carbon dioxide".to_string(),
                    }],
                    answer: "A".to_string(),
                    explanation: "CO2 is carbon dioxide.".to_string(),
                };
                db.save_quiz(note.id, &replacement).expect("Save failed");

                let found = db.get_note(note.id).expect("Query failed").unwrap();
                assert_eq!(found.quiz_question.as_deref(), Some("What is CO2?"));
                assert_eq!(found.to_response().quiz_options.len(), 1);
            }

            it "returns false for a non-existent note" {
                assert!(!db.save_quiz(9999, &sample_quiz()).expect("Save failed"));
            }
        }
    }

    describe "lenient_stored_json" {
        it "recovers from a corrupted translations column" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("notes.db");

            let db = Database::open(path.clone()).expect("Failed to open database");
            db.migrate().expect("Failed to migrate");
            let note = create_test_note(&db);

            // Corrupt the stored JSON behind the repository's back
            let raw = rusqlite::Connection::open(&path).expect("Failed to open raw connection");
            raw.execute(
                "UPDATE notes SET translations = '{not json' WHERE id = ?",
                [note.id],
            ).expect("Failed to corrupt column");

            // Reads degrade to empty instead of failing
            let response = db.get_note(note.id).expect("Query failed").unwrap().to_response();
            assert!(response.translations.is_empty());

            // Writes start over from an empty map
            db.upsert_translation(note.id, "fr", "Bonjour").expect("Upsert failed");
            let translations = db.get_note(note.id).expect("Query failed")
                .unwrap().to_response().translations;
            assert_eq!(translations.len(), 1);
            assert_eq!(translations.get("fr").map(String::as_str), Some("Bonjour"));
        }
    }
}
