/*!
 * Output Buffer Tests
 */

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use script_sandbox::output::{OutputBuffer, OutputError};

#[test]
fn test_append_ab_cd() {
    let mut buffer = OutputBuffer::new(1024, 0).unwrap();
    buffer.append_str("ab").unwrap();
    buffer.append_str("cd").unwrap();
    assert_eq!(buffer.pos(), 4);
    assert_eq!(buffer.as_bytes_with_nul(), b"abcd\0");
}

#[test]
fn test_append_char_and_fmt() {
    let mut buffer = OutputBuffer::new(2, 0).unwrap();
    buffer.append_char(b'[').unwrap();
    buffer.append_fmt(format_args!("{}:{:.1}", "x", 2.5)).unwrap();
    buffer.append_char(b']').unwrap();
    assert_eq!(buffer.as_bytes(), b"[x:2.5]");
}

#[test]
fn test_large_write_needs_several_doublings() {
    let mut buffer = OutputBuffer::new(4, 0).unwrap();
    let payload = vec![b'z'; 1000];
    buffer.append_bytes(&payload).unwrap();
    assert_eq!(buffer.size(), 1024);
    assert_eq!(buffer.as_bytes(), payload.as_slice());
}

#[test]
fn test_ceiling_failure_is_limit_not_oom() {
    let mut buffer = OutputBuffer::new(8, 16).unwrap();
    let err = buffer.append_bytes(&[0u8; 16]).unwrap_err();
    assert_eq!(err, OutputError::LimitExceeded { needed: 17, limit: 16 });
    assert_eq!(err.to_string(), "output_limit exceeded");
    assert_eq!(buffer.pos(), 0);
    assert_eq!(buffer.size(), 8);
}

#[test]
fn test_write_filling_ceiling_exactly() {
    let mut buffer = OutputBuffer::new(8, 16).unwrap();
    buffer.append_bytes(&[b'a'; 15]).unwrap();
    assert_eq!(buffer.size(), 16);
    assert_eq!(buffer.pos(), 15);
}

proptest! {
    #[test]
    fn prop_size_never_exceeds_ceiling(
        ceiling in 1usize..2048,
        initial in 1usize..256,
        writes in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 1..40),
    ) {
        let mut buffer = OutputBuffer::new(initial, ceiling).unwrap();
        let mut expected: Vec<u8> = Vec::new();

        for write in writes {
            let pos_before = buffer.pos();
            match buffer.append_bytes(&write) {
                Ok(()) => expected.extend_from_slice(&write),
                Err(err) => {
                    let is_limit = matches!(err, OutputError::LimitExceeded { .. });
                    prop_assert!(is_limit);
                    prop_assert!(pos_before + write.len() + 1 > ceiling);
                    prop_assert_eq!(buffer.pos(), pos_before);
                }
            }
            prop_assert!(buffer.size() <= ceiling);
            prop_assert_eq!(buffer.as_bytes(), expected.as_slice());
            prop_assert_eq!(buffer.as_bytes_with_nul().last(), Some(&0u8));
        }
    }

    #[test]
    fn prop_unbounded_buffer_holds_everything(
        writes in prop::collection::vec("[a-z]{0,64}", 1..50),
    ) {
        let mut buffer = OutputBuffer::new(1, 0).unwrap();
        for w in &writes {
            buffer.append_str(w).unwrap();
        }
        let expected = writes.concat();
        prop_assert_eq!(buffer.as_bytes(), expected.as_bytes());
    }
}
