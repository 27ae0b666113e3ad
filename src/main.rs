//! # Merkle Patricia Trie Demo
//!
//! Walks the public surface: building a graph the way an external builder
//! would, lookups, size, proofs, clear.

use hexary_trie::{prove, verify_proof, MemoryStore, NibblePath, Node, Trie};

fn main() {
    println!("Merkle Patricia Trie demo\n");

    // =========================================
    // Blank trie
    // =========================================
    println!("=== Blank trie ===");
    let mut trie = Trie::new_memory();
    println!("Root hash: 0x{}", hex::encode(trie.root_hash().unwrap()));
    println!("Size: {}", trie.size().unwrap());
    println!();

    // =========================================
    // A graph for {"do", "dog", "horse"}
    // =========================================
    println!("=== Shared prefix keys ===");
    let mut trie = build_sample();

    let root = trie.root_hash().unwrap();
    println!("Root hash: 0x{}", hex::encode(root));
    println!("Size: {}", trie.size().unwrap());

    for key in ["do", "dog", "horse", "dog2"] {
        match trie.get(key.as_bytes()).unwrap() {
            Some(v) => println!("  '{}' -> '{}'", key, String::from_utf8_lossy(&v)),
            None => println!("  '{}' -> NOT FOUND", key),
        }
    }
    println!();

    // =========================================
    // Reopen by digest
    // =========================================
    println!("=== Reopen by digest ===");
    let mut reopened = Trie::new_at(trie.store().clone(), root.as_slice()).unwrap();
    println!(
        "Reopened 'dog': {:?}",
        reopened
            .get(b"dog")
            .unwrap()
            .map(|v| String::from_utf8_lossy(&v).to_string())
    );
    println!();

    // =========================================
    // SPV proof
    // =========================================
    println!("=== SPV proof ===");
    let proof = prove(&mut trie, b"dog").unwrap();
    println!("Proof nodes: {}", proof.nodes.len());

    let value = verify_proof(root, b"dog", &proof).unwrap();
    println!(
        "Verified 'dog' from proof alone: {:?}",
        value.map(|v| String::from_utf8_lossy(&v).to_string())
    );

    // The "horse" proof never touches the stored node the "do" path needs
    let horse_proof = prove(&mut trie, b"horse").unwrap();
    match verify_proof(root, b"do", &horse_proof) {
        Ok(_) => println!("Unexpected: 'do' verified from the 'horse' proof"),
        Err(err) => println!("Verifying 'do' against the 'horse' proof: {}", err),
    }
    println!();

    // =========================================
    // Clear
    // =========================================
    println!("=== Clear ===");
    trie.clear().unwrap();
    println!("Root hash: 0x{}", hex::encode(trie.root_hash().unwrap()));
    println!("Size: {}", trie.size().unwrap());
    println!(
        "Stored encodings left in place: {}",
        trie.store().len()
    );
}

/// {"do": "verb", "dog": "puppy", "horse": "stallion"}, built bottom-up
fn build_sample() -> Trie<MemoryStore> {
    let mut trie = Trie::new_memory();

    let puppy = Node::leaf(NibblePath::from_nibbles(vec![7]), b"puppy".to_vec());
    let mut inner = Node::empty_branch();
    if let Node::Branch { children, value } = &mut inner {
        children[6] = trie.commit(&puppy).unwrap();
        *value = Some(b"verb".to_vec());
    }

    let fork = Node::extension(
        NibblePath::from_nibbles(vec![6, 0xf]),
        trie.commit(&inner).unwrap(),
    );
    let horse = Node::leaf(
        NibblePath::from_nibbles(vec![6, 0xf, 7, 2, 7, 3, 6, 5]),
        b"stallion".to_vec(),
    );

    let mut top = Node::empty_branch();
    if let Node::Branch { children, .. } = &mut top {
        children[4] = trie.commit(&fork).unwrap();
        children[8] = trie.commit(&horse).unwrap();
    }

    let root = Node::extension(
        NibblePath::from_nibbles(vec![6]),
        trie.commit(&top).unwrap(),
    );
    trie.set_root_node(root);
    trie
}
