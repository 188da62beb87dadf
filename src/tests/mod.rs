//! Builders shared by the unit tests.

use rust_htslib::bam::{
    record::{Aux, Cigar, CigarString},
    Record,
};

use crate::hts::flags;

pub(crate) struct RecordBuilder {
    name: String,
    tid: i32,
    pos: i64,
    mtid: i32,
    mpos: i64,
    flags: u16,
    cigar: Option<String>,
    qual: u8,
    aux: Vec<([u8; 2], AuxValue)>,
}

enum AuxValue {
    Int(i32),
    Str(String),
}

impl RecordBuilder {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tid: 0,
            pos: 0,
            mtid: -1,
            mpos: -1,
            flags: 0,
            cigar: Some("10M".to_string()),
            qual: 30,
            aux: Vec::new(),
        }
    }

    pub(crate) fn pos(mut self, tid: i32, pos: i64) -> Self {
        self.tid = tid;
        self.pos = pos;
        self
    }

    pub(crate) fn cigar(mut self, cigar: &str) -> Self {
        self.cigar = Some(cigar.to_string());
        self
    }

    pub(crate) fn qual(mut self, qual: u8) -> Self {
        self.qual = qual;
        self
    }

    pub(crate) fn reverse(mut self) -> Self {
        self.flags |= flags::REVERSE;
        self
    }

    pub(crate) fn unmapped(mut self) -> Self {
        self.flags |= flags::UNMAPPED;
        self.tid = -1;
        self.pos = -1;
        self.cigar = None;
        self
    }

    /// Paired read whose mate maps to `mtid:mpos`.
    pub(crate) fn mate(mut self, mtid: i32, mpos: i64, first: bool) -> Self {
        self.flags |= flags::PAIRED;
        self.flags |= if first {
            flags::FIRST_IN_TEMPLATE
        } else {
            flags::LAST_IN_TEMPLATE
        };
        self.mtid = mtid;
        self.mpos = mpos;
        self
    }

    pub(crate) fn mate_reverse(mut self) -> Self {
        self.flags |= flags::MATE_REVERSE;
        self
    }

    pub(crate) fn mate_unmapped(mut self, first: bool) -> Self {
        self.flags |= flags::PAIRED | flags::MATE_UNMAPPED;
        self.flags |= if first {
            flags::FIRST_IN_TEMPLATE
        } else {
            flags::LAST_IN_TEMPLATE
        };
        self
    }

    pub(crate) fn flags(mut self, flags: u16) -> Self {
        self.flags |= flags;
        self
    }

    pub(crate) fn read_group(mut self, rg: &str) -> Self {
        self.aux.push((*b"RG", AuxValue::Str(rg.to_string())));
        self
    }

    pub(crate) fn aux_i32(mut self, tag: &str, value: i32) -> Self {
        let b = tag.as_bytes();
        self.aux.push(([b[0], b[1]], AuxValue::Int(value)));
        self
    }

    pub(crate) fn build(self) -> Record {
        let cigar = self
            .cigar
            .as_deref()
            .map(|c| CigarString::try_from(c).unwrap());

        let read_len = cigar
            .as_ref()
            .map(|c| {
                c.0.iter()
                    .map(|op| match op {
                        Cigar::Match(l)
                        | Cigar::Ins(l)
                        | Cigar::SoftClip(l)
                        | Cigar::Equal(l)
                        | Cigar::Diff(l) => *l as usize,
                        _ => 0,
                    })
                    .sum::<usize>()
            })
            .unwrap_or(10);

        let seq = vec![b'A'; read_len];
        let qual = vec![self.qual; read_len];

        let mut rec = Record::new();
        rec.set(self.name.as_bytes(), cigar.as_ref(), &seq, &qual);
        rec.set_tid(self.tid);
        rec.set_pos(self.pos);
        rec.set_mtid(self.mtid);
        rec.set_mpos(self.mpos);
        rec.set_flags(self.flags);

        for (tag, value) in self.aux.iter() {
            match value {
                AuxValue::Int(v) => rec.push_aux(tag, Aux::I32(*v)).unwrap(),
                AuxValue::Str(v) => rec.push_aux(tag, Aux::String(v)).unwrap(),
            }
        }

        rec
    }
}

/// Paired records forming one template; `left` is at `pos1`, `right` at `pos2`.
pub(crate) fn pair(name: &str, tid: i32, pos1: i64, pos2: i64) -> (Record, Record) {
    pair_with_qual(name, tid, pos1, pos2, 30)
}

/// Like [`pair`], with every base quality set to `qual`.
pub(crate) fn pair_with_qual(
    name: &str,
    tid: i32,
    pos1: i64,
    pos2: i64,
    qual: u8,
) -> (Record, Record) {
    let r1 = RecordBuilder::new(name)
        .pos(tid, pos1)
        .mate(tid, pos2, true)
        .mate_reverse()
        .qual(qual)
        .build();
    let r2 = RecordBuilder::new(name)
        .pos(tid, pos2)
        .mate(tid, pos1, false)
        .reverse()
        .qual(qual)
        .build();

    (r1, r2)
}

/// Tags both reads of a template with read group `rg`.
pub(crate) fn with_read_group((mut r1, mut r2): (Record, Record), rg: &str) -> (Record, Record) {
    r1.push_aux(b"RG", Aux::String(rg)).unwrap();
    r2.push_aux(b"RG", Aux::String(rg)).unwrap();
    (r1, r2)
}
