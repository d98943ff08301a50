//! Search-phase integration tests. Each test enciphers a known plaintext
//! under a known key and checks that the relevant phase climbs back to it.
//!
//! The exhaustive five-wheel scan is `#[ignore]`d; run it with
//! `cargo test --release -- --ignored`.

use enigma_crack::{
    analysis::{
        find_plugs, find_ring_settings, find_rotor_configurations,
        fitness::{FitnessFunction, IoCFitness, NgramFitness},
        Decryptor, WheelSet, MAX_PLUGS,
    },
    enigma::{letters, Enigma, Key, WheelId},
};

const CONVOY_REPORT: &str = "The signal station on the headland reported a small \
    convoy steaming north under escort at first light. The shore battery held its \
    fire while the boats put out from the harbour, and the observers passed their \
    bearings back by lamp. By noon the weather had closed in, with a steep sea \
    running past the breakwater and low cloud pressing on the hills, so the patrol \
    was recalled and the watch below sent to stand down before the next gale \
    reached the coast.";

const SURVEY_REPORT: &str = "The press of business kept the superintendent at his \
    desk past supper. The reports spoke of supplies beached at the depot, of \
    bridges repaired and passes opened, and of the slow progress of the survey \
    parties in the upper basin. He supposed the expedition would be stopped by the \
    snows before it reached the pass, but he signed the orders anyway and sent the \
    despatch rider south before the light failed, trusting the weather to hold \
    until the column was through.";

const HARBOUR_NOTE: &str = "Observers superb and expert because experience \
    publishes better explanations. The boats slipped past the boom at dusk and the \
    spotters on the bluff passed six separate bearings to the plotting room before \
    supper. By morning the harbour was empty, the nets were up, and the port \
    captain had dispatched a brisk note to the base staff proposing that the \
    batteries practise against towed targets whenever the swell dropped below six \
    feet.";

fn encipher_with(key: &Key, plaintext: &str) -> String {
    Enigma::from_key(key).encipher(plaintext)
}

fn decrypt_with(key: &Key, cipher: &str) -> String {
    Enigma::from_key(key).encipher(cipher)
}

#[test]
fn position_scan_recovers_wheel_order_and_positions() {
    let truth = Key::new(
        [WheelId::II, WheelId::III, WheelId::I],
        [0, 0, 0],
        [5, 12, 21],
        vec![],
    );
    let cipher = encipher_with(&truth, CONVOY_REPORT);

    let survivors =
        find_rotor_configurations(&cipher, WheelSet::Three, &[], 6, &IoCFitness::new());
    assert_eq!(survivors.len(), 6);

    let best = &survivors[0];
    assert_eq!(*best.key(), truth);
    assert!(best.score() > 0.06, "score {}", best.score());
    assert_eq!(decrypt_with(best.key(), &cipher), letters(CONVOY_REPORT));
}

#[test]
fn ring_search_recovers_coupled_ring_and_position() {
    let truth = Key::new(
        [WheelId::I, WheelId::II, WheelId::III],
        [0, 0, 12],
        [0, 8, 3],
        vec![],
    );
    let cipher = encipher_with(&truth, SURVEY_REPORT);

    // What the position scan would hand over: rings zeroed, each position
    // carrying the same wiring offset as the true key.
    let candidate = Key::new(truth.wheels(), [0, 0, 0], [0, 8, 17], vec![]);

    let refined = find_ring_settings(&cipher, &candidate, &IoCFitness::new());
    assert_eq!(refined.key().rings(), [0, 0, 12]);
    assert_eq!(refined.key().positions(), [0, 8, 3]);
    assert_eq!(decrypt_with(refined.key(), &cipher), letters(SURVEY_REPORT));
}

#[test]
fn plug_search_recovers_the_steckered_pairs() {
    let truth = Key::new(
        [WheelId::I, WheelId::II, WheelId::III],
        [0, 0, 0],
        [4, 11, 19],
        vec![('S', 'X'), ('B', 'P')],
    );
    let cipher = encipher_with(&truth, HARBOUR_NOTE);

    let bigrams: NgramFitness<2> =
        NgramFitness::from_file("data/bigrams.txt").expect("bigram table should load");

    // Start from the true rotor settings with an empty board.
    let rotor_key = Key::new(truth.wheels(), truth.rings(), truth.positions(), vec![]);
    let plugged = find_plugs(&cipher, &rotor_key, MAX_PLUGS, &bigrams);

    let mut pairs = plugged.key().pairs().to_vec();
    pairs.sort_unstable();
    assert_eq!(pairs, vec![('B', 'P'), ('S', 'X')]);
    assert_eq!(decrypt_with(plugged.key(), &cipher), letters(HARBOUR_NOTE));
}

// Full key recovery over the five-wheel space. Roughly a million keys, so
// debug builds take minutes; run under --release.
#[test]
#[ignore = "exhaustive five-wheel scan; run with --release"]
fn full_search_recovers_the_intercept_key() {
    const INTERCEPT: &str = "VQSFHVLXCAWCYZZVJIFXFKFNXSEKWRHSFZNPYRNQUULSRFUKHJBKDOYXRTLKFLXJHOHDZKBQYXORRFQCSFGZXOVMXVQQMJEGVLSS\
                             OZWLMEPNPYBYPDIPADUIXXRGBNUGFVOAXZYLNROXJOMENEMBENOWMFGMLRXBMCBDOKHZVHGAQWNCMGAXCDWQNXYGLAQASXARZWVKG\
                             OPQXEBHVZQXQLLJKJUITMWKOLNHSOZIAJIYDFOHTOMARWJOYBQAJNMKHHPGFZXHPPFKIPSQMJIDNNZBTXTXYGSBLEREOAYYPEAGXS\
                             PNDPUJMZSLTDQYUAQILFFAWSWRJHSHNTJWIGUOHESQNRAYEGDWGLQUGAXHJZNCSVSGSRXNJSTUFKHPQKJHSRXEXXARTJCQCXLADYF\
                             FCDGKJRDJCGFFRQJFEGTRYJNMWKGTROOOCISKJDEUCQTABKLODFNGMRPXNDSEJODWCMTOIFZISTDMPUUUTDLTRJMQRIDADAGLPDFQ\
                             HXVPVHGQJCGBFKJPOUEEIKLYKHWIUXQJDQUUWIRERXULEBFNLJJAFOPHMGOMKWXMYEUFRZYWYJDCBYWH";

    let decryptor = Decryptor::new(INTERCEPT).expect("tables should load");
    let best = decryptor.decrypt();
    let key = best.key();

    // Enciphered at V IV I / 1 15 23 / 22 22 1 with no plugboard. The left
    // rotor's ring never matters on a message this short, so the search
    // pins its wiring offset (position minus ring) rather than the pair.
    assert_eq!(key.wheels(), [WheelId::V, WheelId::IV, WheelId::I]);
    assert_eq!(key.rings()[1], 15);
    assert_eq!(key.rings()[2], 23);
    assert_eq!(key.positions()[1], 22);
    assert_eq!(key.positions()[2], 1);
    assert_eq!((26 + key.positions()[0] - key.rings()[0]) % 26, 21);
    assert!(key.pairs().is_empty(), "spurious plugs: {key}");

    let plaintext = decrypt_with(key, decryptor.ciphertext());
    let ioc = IoCFitness::new().score(&plaintext);
    assert!(ioc > 0.06, "IoC {ioc}");
    assert!(plaintext.starts_with("IPROPOSETOCONSIDERTHEQUESTION"));
}
