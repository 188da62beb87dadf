use rust_htslib::bam::{
    header::HeaderRecord,
    Header,
};
use std::collections::HashSet;

/// Hands out `@PG` IDs that do not collide with the ones already in a header.
pub(crate) struct PgIdGenerator {
    record_counter: usize,
    ids_that_are_already_taken: HashSet<String>,
}

impl PgIdGenerator {
    pub(crate) fn new(header: &Header) -> Self {
        let ids_that_are_already_taken = header
            .to_hashmap()
            .remove("PG")
            .unwrap_or_default()
            .into_iter()
            .filter_map(|mut pgr| pgr.remove("ID"))
            .collect::<HashSet<_>>();

        let record_counter = ids_that_are_already_taken.len();

        Self {
            ids_that_are_already_taken,
            record_counter,
        }
    }

    pub(crate) fn get_non_colliding_id(&mut self, record_id: &str) -> String {
        if !self.ids_that_are_already_taken.contains(record_id) {
            // don't remap 1st record. If there are more records
            // with this id, they will be remapped in the 'else'.
            self.ids_that_are_already_taken.insert(record_id.to_string());
            self.record_counter += 1;

            record_id.to_string()
        } else {
            // Tack on a base36 counter until the id is free.
            loop {
                let new_id = format!(
                    "{}.{}",
                    record_id,
                    positive_base36_str(self.record_counter)
                );
                self.record_counter += 1;

                if self.ids_that_are_already_taken.insert(new_id.clone()) {
                    return new_id;
                }
            }
        }
    }
}

fn positive_base36_str(mut left_over: usize) -> String {
    const INT_TO_BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    if left_over == 0 {
        return "0".into();
    }

    let mut char_vec = Vec::with_capacity(10);
    while left_over > 0 {
        char_vec.push(INT_TO_BASE36[left_over % 36] as char);
        left_over /= 36;
    }

    char_vec.into_iter().rev().collect::<String>()
}

/// Builds the `@PG` record for this run, chaining it to the last program of the input header.
pub(crate) fn program_record(
    header: &Header,
    record_id: &str,
    command_line: &str,
) -> HeaderRecord<'static> {
    let mut id_generator = PgIdGenerator::new(header);
    let id = id_generator.get_non_colliding_id(record_id);

    let previous = header
        .to_hashmap()
        .remove("PG")
        .and_then(|mut pgs| pgs.pop())
        .and_then(|mut pg| pg.remove("ID"));

    let mut record = HeaderRecord::new(b"PG");
    record.push_tag(b"ID", &id);
    record.push_tag(b"PN", &env!("CARGO_PKG_NAME"));
    record.push_tag(b"VN", &env!("CARGO_PKG_VERSION"));
    if let Some(previous) = previous {
        record.push_tag(b"PP", &previous);
    }
    record.push_tag(b"CL", &command_line);

    record
}
