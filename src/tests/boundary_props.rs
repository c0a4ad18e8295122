#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use simd_json::{json, OwnedValue};
    use tokio::sync::mpsc;

    use crate::{BoxError, Fragment, Handoff, SessionConfig, StreamProducer};

    fn run_producer(fragments: Vec<String>) -> Vec<Handoff> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio runtime");

        rt.block_on(async move {
            let items: Vec<Result<Fragment, BoxError>> = fragments.into_iter().map(|f| Ok(Fragment::Text(f))).collect();
            let (tx, mut rx) = mpsc::channel(2);
            let handle = StreamProducer::new(&SessionConfig::default()).spawn(futures::stream::iter(items), tx);
            let mut out = Vec::new();
            while let Some(item) = rx.recv().await {
                out.push(item);
            }
            handle.await.expect("producer join");
            out
        })
    }

    fn decode_lines(text: &str) -> Vec<OwnedValue> {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| simd_json::to_owned_value(&mut line.as_bytes().to_vec()).expect("valid line"))
            .collect()
    }

    fn split_at(text: &str, cuts: &[usize]) -> Vec<String> {
        let mut points: Vec<usize> = cuts
            .iter()
            .map(|cut| {
                let mut at = cut % (text.len() + 1);
                while !text.is_char_boundary(at) {
                    at += 1;
                }
                at
            })
            .collect();
        points.push(0);
        points.push(text.len());
        points.sort_unstable();
        points.dedup();
        points.windows(2).map(|w| text[w[0]..w[1]].to_string()).collect()
    }

    fn extracted(items: &[Handoff]) -> Vec<OwnedValue> {
        items
            .iter()
            .filter_map(|item| match item {
                Handoff::Record(value) => Some(value.clone()),
                Handoff::End(_) => None,
            })
            .collect()
    }

    fn book_line(title: &str, reason: &str) -> String {
        simd_json::to_string(&json!({"title": title, "reason": reason, "meta": {"note": reason}})).unwrap()
    }

    #[test]
    fn test_one_character_at_a_time() {
        let text = format!(
            "{}\n{}\n",
            book_line("A {tricky} \"title\"", "back\\slash }"),
            book_line("Les Misérables 📚", "{{}}")
        );
        let fragments = text.chars().map(String::from).collect();
        let items = run_producer(fragments);

        assert_eq!(extracted(&items), decode_lines(&text));
        assert!(matches!(items.last(), Some(Handoff::End(None))));
    }

    proptest! {
        #[test]
        fn splitting_never_changes_the_records(
            books in proptest::collection::vec(
                ("[a-zA-Z0-9 {}\\[\\]\\\\\"\n:,é📚]{0,24}", "[ -~]{0,16}"),
                0..8
            ),
            cuts in proptest::collection::vec(any::<usize>(), 0..24),
            trailing_newline in any::<bool>(),
        ) {
            let mut text = books
                .iter()
                .map(|(title, reason)| book_line(title, reason))
                .collect::<Vec<_>>()
                .join("\n");
            if trailing_newline && !text.is_empty() {
                text.push('\n');
            }

            let items = run_producer(split_at(&text, &cuts));

            prop_assert_eq!(extracted(&items), decode_lines(&text));
            let ends = items.iter().filter(|item| matches!(item, Handoff::End(_))).count();
            prop_assert_eq!(ends, 1);
            prop_assert!(matches!(items.last(), Some(Handoff::End(None))));
        }
    }
}
