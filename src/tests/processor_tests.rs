#[cfg(test)]
mod tests {
    use simd_json::{base::ValueAsScalar, derived::ValueObjectAccess, json, OwnedValue};

    use crate::processor::display_field;
    use crate::{
        recommendation_prompt, Availability, Book, FixedStock, RandomStock, RecordProcessor, StockCheck,
        AVAILABILITY_FIELD, REQUIRED_FIELDS,
    };

    #[test]
    fn test_missing_fields_are_filled_with_empty_strings() {
        let processor = RecordProcessor::new(FixedStock(Availability::InStock));
        let record = processor.process(json!({"title": "Neuromancer"}));

        assert_eq!(record.get("title").and_then(|v| v.as_str()), Some("Neuromancer"));
        for field in ["author", "isbn", "genre", "reason"] {
            assert_eq!(record.get(field).and_then(|v| v.as_str()), Some(""), "field {field}");
        }
        assert_eq!(record.get(AVAILABILITY_FIELD).and_then(|v| v.as_str()), Some("✅"));
    }

    #[test]
    fn test_present_and_extra_fields_pass_through() {
        let processor = RecordProcessor::new(FixedStock(Availability::OutOfStock));
        let input = json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "isbn": "9780441172719",
            "genre": "Science Fiction",
            "reason": "Sandworms",
            "year": "1965"
        });
        let record = processor.process(input);

        assert_eq!(record.get("author").and_then(|v| v.as_str()), Some("Frank Herbert"));
        assert_eq!(record.get("year").and_then(|v| v.as_str()), Some("1965"));
        assert_eq!(record.get(AVAILABILITY_FIELD).and_then(|v| v.as_str()), Some("❌"));
    }

    #[test]
    fn test_fill_is_idempotent() {
        let processor = RecordProcessor::new(FixedStock(Availability::InStock));
        let once = processor.process(json!({"title": "Dune", "genre": "SF"}));
        let twice = processor.process(once.clone());
        assert_eq!(once, twice);
        for field in REQUIRED_FIELDS {
            assert!(twice.get(field).is_some());
        }
    }

    #[test]
    fn test_non_objects_are_returned_unchanged() {
        let processor = RecordProcessor::default();
        let input = OwnedValue::from("just text");
        assert_eq!(processor.process(input.clone()), input);

        let list = json!(["a", "b"]);
        assert_eq!(processor.process(list.clone()), list);
    }

    #[test]
    fn test_random_stock_extremes() {
        let always = RandomStock::new(1.0);
        let never = RandomStock::new(0.0);
        let empty = simd_json::owned::Object::default();
        for _ in 0..50 {
            assert_eq!(always.check(&empty), Availability::InStock);
            assert_eq!(never.check(&empty), Availability::OutOfStock);
        }
        // Out-of-range ratios are clamped rather than rejected.
        assert_eq!(RandomStock::new(7.0).check(&empty), Availability::InStock);
    }

    #[test]
    fn test_nan_ratio_falls_back_to_default() {
        let stock = RandomStock::new(f64::NAN);
        assert_eq!(stock.ratio(), RandomStock::DEFAULT_RATIO);

        let processor = RecordProcessor::new(stock);
        let record = processor.process(json!({"title": "Dune"}));
        assert!(record.get(AVAILABILITY_FIELD).is_some());
    }

    #[test]
    fn test_non_string_fields_are_logged_as_json() {
        assert_eq!(display_field(Some(&json!("Dune"))), "Dune");
        assert_eq!(display_field(Some(&json!(["Pratchett", "Gaiman"]))), r#"["Pratchett","Gaiman"]"#);
        assert_eq!(display_field(Some(&json!({"name": "Le Guin"}))), r#"{"name":"Le Guin"}"#);
        assert_eq!(display_field(None), "");
    }

    #[test]
    fn test_book_view_of_processed_record() {
        let processor = RecordProcessor::new(FixedStock(Availability::InStock));
        let record = processor.process(json!({"title": "Dune", "author": "Frank Herbert"}));
        let book = Book::from_record(record).unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.isbn, "");
        assert_eq!(book.availability, Some(Availability::InStock));
    }

    #[test]
    fn test_prompt_mentions_query_and_format() {
        let prompt = recommendation_prompt("books about whales");
        assert!(prompt.starts_with("Answer this question: books about whales\n\n"));
        assert!(prompt.contains("NDJSON"));
        assert!(prompt.contains("title, author, isbn, genre, and reason"));
    }
}
