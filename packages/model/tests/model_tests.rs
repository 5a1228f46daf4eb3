use richtext_model::*;

fn paragraph_with_runs(model: &mut Model, runs: Vec<Fragment>) -> NodeId {
    let root = model.root();
    let id = model
        .change(ChangeOrigin::Load, |w| {
            let index = w.model().children(root).len();
            w.insert(root, index, Fragment::paragraph().with_children(runs))
        })
        .unwrap();
    model.take_batches();
    id
}

#[test]
fn test_apply_outside_change_is_rejected() {
    let mut model = Model::new();
    let root = model.root();

    let result = model.apply(Operation::Insert {
        parent: root,
        index: 0,
        fragment: Fragment::paragraph(),
    });

    assert_eq!(result, Err(ModelError::TransactionViolation));
    assert!(model.children(root).is_empty());
}

#[test]
fn test_nested_changes_flatten_into_one_batch() {
    let mut model = Model::new();
    let root = model.root();

    model
        .change(ChangeOrigin::User, |w| {
            w.insert(root, 0, Fragment::paragraph())?;
            w.change(|inner| inner.insert(root, 1, Fragment::paragraph()))?;
            Ok(())
        })
        .unwrap();

    let batches = model.take_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].operations.len(), 2);
    assert_eq!(model.version(), 1);
}

#[test]
fn test_failed_change_rolls_back() {
    let mut model = Model::new();
    let paragraph = paragraph_with_runs(&mut model, vec![Fragment::text("abc")]);

    let result = model.change(ChangeOrigin::User, |w| {
        w.set_attribute(paragraph, keys::ANCHOR, "intro")?;
        // Paragraphs may not carry link keys
        w.set_attribute(paragraph, keys::LINK_HREF, "https://example.com")
    });

    assert!(matches!(result, Err(ModelError::AttributeNotAllowed { .. })));
    assert_eq!(model.get(paragraph).unwrap().anchor(), None);
    assert!(model.take_batches().is_empty());
}

#[test]
fn test_inverses_restore_previous_tree() {
    let mut model = Model::new();
    let paragraph = paragraph_with_runs(&mut model, vec![Fragment::text("hello world")]);
    let before = model.to_fragment(model.root()).unwrap();

    model
        .change(ChangeOrigin::User, |w| {
            w.set_attribute_on_range(&Range::new(paragraph, 6, 11), keys::LINK_HREF, "https://x.test")?;
            w.split_block(Position::new(paragraph, 3))?;
            Ok(())
        })
        .unwrap();
    let batch = model.take_batches().remove(0);

    model
        .change(ChangeOrigin::Undo, |w| {
            for inverse in batch.inverses.iter().rev() {
                w.apply(inverse.clone())?;
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(model.to_fragment(model.root()).unwrap(), before);
}

#[test]
fn test_removed_node_is_detached() {
    let mut model = Model::new();
    let paragraph = paragraph_with_runs(&mut model, vec![Fragment::embed_inline("42")]);
    let embed = model.children(paragraph)[0];
    assert!(model.is_attached(embed));

    model.change(ChangeOrigin::User, |w| w.remove(paragraph)).unwrap();

    assert!(!model.is_attached(embed));
    assert!(model.get(embed).is_none());
}

#[test]
fn test_find_attribute_range_spans_contiguous_runs() {
    let mut model = Model::new();
    let href = AttributeValue::from("https://example.com");
    let paragraph = paragraph_with_runs(
        &mut model,
        vec![
            Fragment::text("see "),
            Fragment::text("the ").with_attr(keys::LINK_HREF, href.clone()),
            Fragment::text("site").with_attr(keys::LINK_HREF, href.clone()).with_attr(keys::BOLD, "true"),
            Fragment::text(" now"),
        ],
    );

    let range = model.find_attribute_range(Position::new(paragraph, 6), keys::LINK_HREF, &href);
    assert_eq!(range, Range::new(paragraph, 4, 12));

    // Caret right after the link still finds it
    let range = model.find_attribute_range(Position::new(paragraph, 12), keys::LINK_HREF, &href);
    assert_eq!(range, Range::new(paragraph, 4, 12));

    // Caret outside any link stays collapsed
    let range = model.find_attribute_range(Position::new(paragraph, 14), keys::LINK_HREF, &href);
    assert!(range.is_collapsed());
}

#[test]
fn test_selection_is_sanitized_after_removal() {
    let mut model = Model::new();
    let first = paragraph_with_runs(&mut model, vec![Fragment::text("one")]);
    let second = paragraph_with_runs(&mut model, vec![Fragment::text("two")]);
    model.set_selection(Selection::caret(Position::new(second, 2)));

    model.change(ChangeOrigin::User, |w| w.remove(second)).unwrap();

    assert_eq!(model.selection().first_position(), Some(Position::new(first, 0)));
}

#[test]
fn test_selection_blocks_and_context() {
    let mut model = Model::new();
    let first = paragraph_with_runs(&mut model, vec![Fragment::text("one")]);
    let second = paragraph_with_runs(&mut model, vec![Fragment::text("two")]);
    let root = model.root();

    model.set_selection(Selection::from_range(Range::new(root, 0, 2)));
    assert_eq!(model.selection_blocks(), vec![first, second]);

    model.set_selection(Selection::caret(Position::new(second, 1)));
    assert_eq!(model.context_element(), Some(second));
    assert_eq!(model.selected_element(), None);

    model.set_selection(Selection::from_range(Range::new(root, 1, 2)));
    assert_eq!(model.selected_element(), Some(second));
}
