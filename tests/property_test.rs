//! Property tests for the resolution engine

use proptest::prelude::*;
use rategen::{
    carries_macros, Backend, GenerationControl, GenerationRequest, MemoryTemplateStore, NoSchema,
};

fn preview(backend: Backend, text: &str) -> Vec<String> {
    let store = MemoryTemplateStore::new();
    let request = GenerationRequest::new("prop", "PGUOBK3.cbl", "BOP", "RATE", true)
        .with_linkage_prefix("ABC");
    GenerationControl::new(backend.registry(), &NoSchema, &store)
        .preview(&request, text)
        .unwrap()
}

proptest! {
    /// Lines without a marker character pass through untouched
    #[test]
    fn plain_lines_are_identity(line in "[A-Za-z0-9 .,:*()'=|-]{1,60}") {
        prop_assert!(!carries_macros(&line));
        prop_assert_eq!(preview(Backend::Cobol, &line), vec![line.clone()]);
    }

    /// Macros are only recognized when a pipe follows the marker
    #[test]
    fn markers_without_pipes_are_identity(line in "[A-Za-z0-9 .$&-]{1,60}") {
        prop_assert_eq!(preview(Backend::Cobol, &line), vec![line.clone()]);
    }

    /// Arbitrary macro soup terminates without panicking
    #[test]
    fn arbitrary_lines_terminate(
        line in "([A-Z ]{0,4}[&$](PGM|LOB|CMNT|SET|GET|UPPER|KEYWHERE|SELCOLS|INCLUDE|BOGUS|<|!)?[|(]?[A-Za-z ,]{0,6}[|)]?){1,6}",
        java in any::<bool>(),
    ) {
        let backend = if java { Backend::Java } else { Backend::Cobol };
        let store = MemoryTemplateStore::new();
        let request = GenerationRequest::new("prop", "PGUOBK3.cbl", "BOP", "RATE", true);
        // INCLUDE of a missing template is the only expected failure
        let _ = GenerationControl::new(backend.registry(), &NoSchema, &store)
            .preview(&request, &line);
    }

    /// Resolving already-resolved output changes nothing
    #[test]
    fn resolved_output_is_stable(
        parts in proptest::collection::vec(
            prop_oneof![
                Just("&PGM|".to_string()),
                Just("&LOB|".to_string()),
                Just("$PROC|".to_string()),
                Just("&UPPER|abc|".to_string()),
                Just("&<|ABC|x".to_string()),
                "[A-Z .]{1,8}",
            ],
            1..6,
        )
    ) {
        let once = preview(Backend::Cobol, &parts.concat());
        let twice = preview(Backend::Cobol, &once.join("\n"));
        prop_assert_eq!(once, twice);
    }
}
