use std::time::Instant;

use enigma_crack::{
    analysis::Decryptor,
    enigma::Enigma,
};

// A 584-letter intercept enciphered at V IV I / 1 15 23 / 22 22 1 with no
// plugboard. Long enough that the Index of Coincidence pulls the true
// wheel order well clear of the field.
const CIPHER_TEXT: &str = "VQSFHVLXCAWCYZZVJIFXFKFNXSEKWRHSFZNPYRNQUULSRFUKHJBKDOYXRTLKFLXJHOHDZKBQYXORRFQCSFGZXOVMXVQQMJEGVLSS\
                           OZWLMEPNPYBYPDIPADUIXXRGBNUGFVOAXZYLNROXJOMENEMBENOWMFGMLRXBMCBDOKHZVHGAQWNCMGAXCDWQNXYGLAQASXARZWVKG\
                           OPQXEBHVZQXQLLJKJUITMWKOLNHSOZIAJIYDFOHTOMARWJOYBQAJNMKHHPGFZXHPPFKIPSQMJIDNNZBTXTXYGSBLEREOAYYPEAGXS\
                           PNDPUJMZSLTDQYUAQILFFAWSWRJHSHNTJWIGUOHESQNRAYEGDWGLQUGAXHJZNCSVSGSRXNJSTUFKHPQKJHSRXEXXARTJCQCXLADYF\
                           FCDGKJRDJCGFFRQJFEGTRYJNMWKGTROOOCISKJDEUCQTABKLODFNGMRPXNDSEJODWCMTOIFZISTDMPUUUTDLTRJMQRIDADAGLPDFQ\
                           HXVPVHGQJCGBFKJPOUEEIKLYKHWIUXQJDQUUWIRERXULEBFNLJJAFOPHMGOMKWXMYEUFRZYWYJDCBYWH";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let decryptor = Decryptor::new(CIPHER_TEXT)?;
    let start = Instant::now();

    let best = decryptor.decrypt();

    println!("Search time: {:?}", start.elapsed());
    println!("Recovered key: {} (score {})", best.key(), best.score());

    let mut machine = Enigma::from_key(best.key());
    println!("Decryption: {}", machine.encipher(decryptor.ciphertext()));

    Ok(())
}
