use std::io::Write;

use crate::quark::Quark;

use super::tagger::Tagger;

pub trait Model {
    fn tagger(&self) -> impl Tagger + '_;
    fn labels(&self) -> &Quark;
    fn attrs(&self) -> &Quark;
    /// Writes a human readable listing of the model.
    fn dump<W: Write>(&self, w: W) -> std::io::Result<()>;
}
