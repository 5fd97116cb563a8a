//! One compiled grammar shared by concurrent tokenization calls

use hilex::grammar::builtin;
use hilex::testing::Samples;
use hilex::Error;
use std::sync::Arc;
use std::thread;

#[test]
fn test_shared_grammar_across_threads() {
    let grammar = Arc::new(builtin::mercury().unwrap());
    let module = Samples::mercury("module");
    let broken = Samples::mercury("newline-in-string");
    let expected = grammar.tokenize(module.source()).unwrap();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let grammar = Arc::clone(&grammar);
                let source = if i % 2 == 0 {
                    module.source()
                } else {
                    broken.source()
                };
                scope.spawn(move || grammar.tokenize(source))
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.join().unwrap();
            if i % 2 == 0 {
                assert_eq!(result.unwrap(), expected);
            } else {
                assert!(matches!(result, Err(Error::IllegalSequence { offset: 14, .. })));
            }
        }
    });
}
