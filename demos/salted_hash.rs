use once_kit::{id, while_md5, HexCase, IteratedHash, Sha256, NO_SALTS};

fn main() {
   let password = "correct horse";
   let salts = [Some(id::random_id(8)), None, Some(id::random_id(8))];

   println!("plain x3:  {:?}", while_md5(Some(password), 3, false, NO_SALTS));
   println!("salted x3: {:?}", while_md5(Some(password), 3, true, &salts));

   let sha = IteratedHash::new(Sha256).case(HexCase::Upper);
   println!("sha256 x2: {}", sha.hash(password, 2, &salts));
   println!("request id: {}", id::uuid());
}
