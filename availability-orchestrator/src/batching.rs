use observatory_db::models::ProbeWorkUnit;

/// Groups work units by store (preserving first-seen order) and chunks each
/// store's units into batches of at most `max_batch_size`, so a worker never
/// crosses a store boundary mid-batch and can reuse one warmed-up session
/// for the whole batch. The last chunk of a store's group may fall below
/// `min_batch_size` when the group itself is smaller than that.
pub fn batch_by_store(work: Vec<ProbeWorkUnit>, min_batch_size: usize, max_batch_size: usize) -> Vec<Vec<ProbeWorkUnit>> {
    let max_batch_size = max_batch_size.max(min_batch_size).max(1);

    let mut order: Vec<i64> = Vec::new();
    let mut grouped: std::collections::HashMap<i64, Vec<ProbeWorkUnit>> = std::collections::HashMap::new();
    for unit in work {
        grouped.entry(unit.store_id).or_insert_with(|| {
            order.push(unit.store_id);
            Vec::new()
        });
        grouped.get_mut(&unit.store_id).unwrap().push(unit);
    }

    let mut batches = Vec::new();
    for store_id in order {
        let units = grouped.remove(&store_id).unwrap_or_default();
        for chunk in units.chunks(max_batch_size) {
            batches.push(chunk.to_vec());
        }
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(store_id: i64, item_id: i64) -> ProbeWorkUnit {
        ProbeWorkUnit {
            ean: format!("ean-{item_id}"),
            sku_id: item_id,
            item_id,
            seller_id: "1".into(),
            store_id,
            vtex_pickup_point_id: "pp".into(),
            postal_code: "1425".into(),
        }
    }

    #[test]
    fn chunks_never_cross_store_boundaries() {
        let work = vec![unit(1, 1), unit(1, 2), unit(2, 3), unit(1, 4)];
        let batches = batch_by_store(work, 1, 2);
        for batch in &batches {
            let store_ids: std::collections::HashSet<_> = batch.iter().map(|u| u.store_id).collect();
            assert_eq!(store_ids.len(), 1);
        }
        let total: usize = batches.iter().map(|b| b.len()).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn small_group_still_produces_one_batch() {
        let work = vec![unit(1, 1)];
        let batches = batch_by_store(work, 20, 50);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
    }

    #[test]
    fn empty_work_produces_no_batches() {
        assert!(batch_by_store(Vec::new(), 20, 50).is_empty());
    }
}
