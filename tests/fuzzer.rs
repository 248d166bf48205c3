use std::collections::{BTreeMap, BTreeSet};
use rand::prelude::*;
use smartstring::alias::String as SmartString;
use diamond_tree::*;

const SETUP: ActorId = ActorId([0xee; 12]);
const KEYS: &[&str] = &["bold", "italic", "color", "size"];

fn setup_id(n: u32) -> TreeNodeId {
    TreeNodeId::from(Ticket::new(0, n, SETUP))
}

fn tree_ticket() -> Ticket { setup_id(0).created_at }

/// <doc> with a handful of paragraphs, each holding some text and an inline span. The replica
/// has no actor yet.
fn new_doc() -> Document {
    let doc = setup_id(0);
    let mut tree = CrdtTree::new(doc, "doc");
    let mut n = 1;
    for _ in 0..5 {
        let p = setup_id(n);
        tree.insert_element(&doc, p, "p").unwrap();
        tree.insert_text(&p, setup_id(n + 1), "text").unwrap();
        tree.insert_element(&p, setup_id(n + 2), "span").unwrap();
        n += 3;
    }

    let mut d = Document::new(DocOptions::default());
    d.root_mut().register_element(Element::Tree(tree));
    d
}

#[derive(Debug, Clone, Copy, Default)]
struct FuzzOpts {
    /// Replicas edit before they're given an actor, and only get one when they first sync.
    bind_late: bool,
    /// Replicas collect garbage between syncs, using the minimum of everyone's version vector.
    collect_midway: bool,
}

fn tree(doc: &Document) -> &CrdtTree {
    doc.root().find_by_created_at(&tree_ticket()).unwrap().as_tree().unwrap()
}

/// Every position in the document, in document order.
fn all_positions() -> Vec<TreePos> {
    let doc = setup_id(0);
    let mut result = vec![];
    let mut n = 1;
    for i in 0..5u32 {
        result.push(TreePos::new(doc, i));
        let p = setup_id(n);
        result.push(TreePos::new(p, 0));
        result.push(TreePos::new(p, 1));
        // Inside the span, which sits between offsets 1 and 2 of its paragraph.
        if i % 2 == 0 {
            result.push(TreePos::new(setup_id(n + 2), 0));
        }
        result.push(TreePos::new(p, 2));
        n += 3;
    }
    result.push(TreePos::new(doc, 5));
    result
}

fn random_str(len: usize, rng: &mut SmallRng) -> SmartString {
    let alphabet: Vec<char> = "abcdefghijklmnop_".chars().collect();
    let mut s = SmartString::new();
    for _ in 0..len {
        s.push(alphabet[rng.gen_range(0..alphabet.len())]);
    }
    s
}

fn make_random_change(doc: &mut Document, positions: &[TreePos], rng: &mut SmallRng) {
    let a = rng.gen_range(0..positions.len());
    let b = rng.gen_range(0..positions.len());
    let (from, to) = (positions[a.min(b)], positions[a.max(b)]);
    let remove = rng.gen_bool(0.3);

    let num_keys = rng.gen_range(1..=2);
    let keys: Vec<SmartString> = (0..num_keys)
        .map(|_| KEYS[rng.gen_range(0..KEYS.len())].into())
        .collect();
    let value_len = rng.gen_range(1..5);
    let values: Vec<SmartString> = (0..num_keys).map(|_| random_str(value_len, rng)).collect();

    doc.update(None, |ctx, _root| {
        let at = ctx.issue_ticket();
        let op = if remove {
            TreeStyle::new_remove(tree_ticket(), from, to, keys, at)?
        } else {
            let attrs: BTreeMap<SmartString, SmartString> = keys.into_iter().zip(values).collect();
            TreeStyle::new(tree_ticket(), from, to, attrs, at)?
        };
        ctx.push(op);
        Ok(())
    }).unwrap();
}

/// Replicas talk through a central log, the way a sync server would order changes.
struct Server {
    log: Vec<Change>,
}

fn sync(doc: &mut Document, cursor: &mut usize, server: &mut Server, rng: &mut SmallRng) {
    server.log.extend(doc.drain_local_changes());

    // Sometimes resend a bit of history we've already seen.
    let start = if *cursor > 0 && rng.gen_bool(0.2) {
        rng.gen_range(0..*cursor)
    } else { *cursor };

    doc.apply_changes(&server.log[start..]).unwrap();
    *cursor = server.log.len();
}

fn min_version_vector(docs: &[Document]) -> VersionVector {
    docs.iter()
        .map(|d| d.version_vector().clone())
        .reduce(|a, b| a.min(&b))
        .unwrap()
}

fn created_set(doc: &Document) -> BTreeSet<FragmentRef> {
    doc.root().gc_pairs().map(|p| p.created.clone()).collect()
}

/// Replicas which have collected at different times hold different garbage, but the same content.
fn assert_same_content(docs: &[Document]) {
    let first = &docs[0];
    for doc in &docs[1..] {
        assert_eq!(tree(doc).to_xml(), tree(first).to_xml());
        assert_eq!(doc.root().doc_size().live, first.root().doc_size().live);
    }
}

fn assert_converged(docs: &[Document]) {
    assert_same_content(docs);
    let first = &docs[0];
    for doc in &docs[1..] {
        assert_eq!(created_set(doc), created_set(first));
        assert_eq!(doc.root().doc_size(), first.root().doc_size());
    }
}

struct Replicas {
    docs: Vec<Document>,
    cursors: Vec<usize>,
    server: Server,
}

impl Replicas {
    fn new(opts: FuzzOpts) -> Self {
        let mut docs: Vec<Document> = (0..3).map(|_| new_doc()).collect();
        if !opts.bind_late {
            for (i, doc) in docs.iter_mut().enumerate() {
                doc.set_actor(replica_actor(i)).unwrap();
            }
        }
        Self { cursors: vec![0; docs.len()], docs, server: Server { log: vec![] } }
    }

    fn sync(&mut self, i: usize, rng: &mut SmallRng) {
        // Nothing may leave a replica until it knows who it is.
        if self.docs[i].actor().is_initial() {
            self.docs[i].set_actor(replica_actor(i)).unwrap();
        }
        sync(&mut self.docs[i], &mut self.cursors[i], &mut self.server, rng);
    }

    /// Two rounds, so everyone's last changes reach everyone else.
    fn sync_all(&mut self, rng: &mut SmallRng) {
        for _ in 0..2 {
            for i in 0..self.docs.len() {
                self.sync(i, rng);
            }
        }
    }
}

fn replica_actor(i: usize) -> ActorId {
    ActorId::new([i as u8 + 1; 12])
}

fn run_fuzzer(seed: u64, steps: usize, opts: FuzzOpts) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut rng = SmallRng::seed_from_u64(seed);
    let positions = all_positions();
    let mut r = Replicas::new(opts);

    for step in 0..steps {
        let i = rng.gen_range(0..r.docs.len());
        if opts.collect_midway && rng.gen_bool(0.1) {
            let min_synced = min_version_vector(&r.docs);
            r.docs[i].garbage_collect(&min_synced);
        } else if rng.gen_bool(0.7) {
            for _ in 0..rng.gen_range(1..4) {
                make_random_change(&mut r.docs[i], &positions, &mut rng);
            }
        } else {
            r.sync(i, &mut rng);
        }
        r.docs[i].root().dbg_check();

        if step % 50 == 49 {
            r.sync_all(&mut rng);
            if opts.collect_midway {
                assert_same_content(&r.docs);
            } else {
                assert_converged(&r.docs);
            }
        }
    }

    r.sync_all(&mut rng);
    assert_same_content(&r.docs);

    // Everyone has seen everything, so all the garbage can go.
    let min_synced = min_version_vector(&r.docs);
    for doc in r.docs.iter_mut() {
        doc.garbage_collect(&min_synced);
        assert_eq!(doc.root().gc_pair_len(), 0);
        assert!(doc.root().doc_size().gc.is_zero());
        doc.root().dbg_check();
    }
    assert_converged(&r.docs);
}

#[test]
fn random_style_convergence() {
    for seed in 0..20 {
        run_fuzzer(seed, 200, FuzzOpts::default());
    }
}

#[test]
fn random_style_convergence_bind_late() {
    for seed in 0..20 {
        run_fuzzer(seed, 200, FuzzOpts { bind_late: true, ..Default::default() });
    }
}

#[test]
fn random_style_convergence_with_gc() {
    for seed in 0..20 {
        run_fuzzer(seed, 200, FuzzOpts { collect_midway: true, ..Default::default() });
    }
}

#[test]
fn random_style_convergence_bind_late_with_gc() {
    for seed in 0..20 {
        run_fuzzer(seed, 200, FuzzOpts { bind_late: true, collect_midway: true });
    }
}

#[test]
#[ignore]
fn random_style_convergence_forever() {
    for seed in 0.. {
        if seed % 100 == 0 { println!("seed {seed}"); }
        run_fuzzer(seed, 1000, FuzzOpts { bind_late: seed % 2 == 0, collect_midway: seed % 3 != 0 });
    }
}
